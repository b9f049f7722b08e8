// HTTP request handlers
use crate::application::report_service::{ReportError, ReportRequest};
use crate::domain::enricher::Credentials;
use crate::domain::layout::{LayoutMode, Theme};
use crate::domain::variables::Variables;
use crate::infrastructure::config::{Orientation, Settings};
use crate::infrastructure::http_response::{error_response, report_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Response,
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Render every panel of `dashUid` and return the per-panel summary in report order
pub async fn report(
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let request = match build_request(Variables::from(params), &headers, &state.settings) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let uid = request.dashboard_uid.clone();
    match state.report_service.generate(request).await {
        Ok(report) => report_response(&report),
        Err(e) => {
            tracing::error!(dashboard = %uid, "Report failed: {}", e);
            error_response(&e)
        }
    }
}

/// Resolve the dashboard uid, credentials and per-request setting overrides.
pub fn build_request(
    params: Variables,
    headers: &HeaderMap,
    settings: &Arc<Settings>,
) -> Result<ReportRequest, ReportError> {
    let dashboard_uid = params
        .get("dashUid")
        .filter(|uid| !uid.is_empty())
        .ok_or(ReportError::MissingDashboardUid)?
        .to_string();

    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(Credentials::from_header)
        .unwrap_or_else(|| settings.service_credentials());

    let layout = params.get("layout").map(str::parse::<LayoutMode>).transpose().map_err(|reason| invalid("layout", reason))?;
    let theme = params.get("theme").map(str::parse::<Theme>).transpose().map_err(|reason| invalid("theme", reason))?;
    let orientation = params.get("orientation").map(parse_orientation).transpose()?;

    let settings = if layout.is_none() && theme.is_none() && orientation.is_none() {
        settings.clone()
    } else {
        let mut overridden = Settings::clone(settings);
        overridden.layout = layout.unwrap_or(overridden.layout);
        overridden.theme = theme.unwrap_or(overridden.theme);
        overridden.orientation = orientation.unwrap_or(overridden.orientation);
        Arc::new(overridden)
    };

    Ok(ReportRequest {
        dashboard_uid,
        parameters: params,
        credentials,
        settings,
    })
}

fn parse_orientation(value: &str) -> Result<Orientation, ReportError> {
    match value {
        "portrait" => Ok(Orientation::Portrait),
        "landscape" => Ok(Orientation::Landscape),
        other => Err(invalid(
            "orientation",
            format!("orientation: {} must be one of [portrait,landscape]", other),
        )),
    }
}

fn invalid(name: &str, reason: String) -> ReportError {
    ReportError::InvalidParameter {
        name: name.to_string(),
        reason,
    }
}
