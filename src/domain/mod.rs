// Domain layer - Dashboard models and pure rendering rules
pub mod dashboard;
pub mod enricher;
pub mod layout;
pub mod parameters;
pub mod render;
pub mod variables;
