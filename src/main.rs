// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::panel_renderer::{PanelRenderer, RetryPolicy};
use crate::application::report_service::ReportService;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::grafana_repository::GrafanaRepository;
use crate::infrastructure::http_transport::{build_client, HttpImageRenderer};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = Arc::new(load_settings()?);
    let app_url = settings.app_url()?;
    tracing::info!(
        app_url = %app_url,
        layout = ?settings.layout,
        dashboard_mode = ?settings.dashboard_mode,
        theme = ?settings.theme,
        orientation = ?settings.orientation,
        native_rendering = settings.native_rendering,
        max_browser_workers = settings.max_browser_workers,
        max_render_workers = settings.max_render_workers,
        custom_query_params = settings.custom_query_params.len(),
        skip_tls_check = settings.skip_tls_check,
        "Loaded reporter settings"
    );

    // Create adapters (infrastructure layer)
    let client = build_client(&settings)?;
    let repository = Arc::new(GrafanaRepository::new(app_url.clone(), client.clone()));
    let images = Arc::new(HttpImageRenderer::with_client(client));

    // Browser automation is provided by an external capability; none is attached here.
    if settings.native_rendering {
        tracing::warn!("Native rendering is enabled but no browser is attached; panels will fail");
    }

    // Create services (application layer)
    let renderer = PanelRenderer::new(images, None, RetryPolicy::from_settings(&settings));
    let report_service = ReportService::new(repository, renderer, app_url);

    // Create application state
    let state = Arc::new(AppState {
        report_service,
        settings: settings.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/report", get(report))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings.listen_addr.parse()?;
    tracing::info!("Starting dashboard-reporter service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
