// Application layer - Use cases and the traits they depend on
pub mod browser;
pub mod dashboard_repository;
pub mod image_renderer;
pub mod panel_renderer;
pub mod report_service;
pub mod scheduler;
