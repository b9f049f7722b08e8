// Application state for HTTP handlers
use crate::application::report_service::ReportService;
use crate::infrastructure::config::Settings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub settings: Arc<Settings>,
}
