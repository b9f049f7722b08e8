// HTTP response builders for report results
use crate::application::report_service::{Report, ReportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub uid: String,
    pub title: String,
    pub panels: Vec<PanelSummary>,
}

/// One entry per panel, in report order. Failed panels carry `error` instead of image metadata.
#[derive(Debug, Serialize)]
pub struct PanelSummary {
    pub id: String,
    pub title: String,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        let panels = report
            .panels
            .iter()
            .map(|(panel, result)| match &result.outcome {
                Ok(image) => PanelSummary {
                    id: result.panel_id.clone(),
                    title: panel.title.clone(),
                    attempts: result.attempts,
                    bytes: Some(image.bytes.len()),
                    content_type: image.content_type.clone(),
                    error: None,
                },
                Err(err) => PanelSummary {
                    id: result.panel_id.clone(),
                    title: panel.title.clone(),
                    attempts: result.attempts,
                    bytes: None,
                    content_type: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();

        Self {
            uid: report.uid.clone(),
            title: report.title.clone(),
            panels,
        }
    }
}

pub fn report_response(report: &Report) -> Response {
    (StatusCode::OK, Json(ReportSummary::from(report))).into_response()
}

pub fn error_status(err: &ReportError) -> StatusCode {
    match err {
        ReportError::MissingDashboardUid | ReportError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        ReportError::DashboardFetch(_) => StatusCode::BAD_GATEWAY,
    }
}

pub fn error_response(err: &ReportError) -> Response {
    let body = serde_json::json!({ "error": err.to_string() });
    (error_status(err), Json(body)).into_response()
}
