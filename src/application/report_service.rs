// Report service - Use case for rendering every panel of a dashboard in report order
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::panel_renderer::{PanelRenderer, RenderContext};
use crate::application::scheduler::{Scheduler, WorkerPools};
use crate::domain::dashboard::{Dashboard, Panel};
use crate::domain::enricher::Credentials;
use crate::domain::parameters::classify;
use crate::domain::render::RenderResult;
use crate::domain::variables::{TimeRange, Variables};
use crate::infrastructure::config::Settings;
use reqwest::Url;
use std::sync::Arc;
use std::time::Instant as StdInstant;
use thiserror::Error;
use tokio::time::Instant;

/// Failures that abort a whole report before any panel is scheduled.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("missing dashboard identifier (dashUid)")]
    MissingDashboardUid,

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("failed to fetch dashboard: {0:#}")]
    DashboardFetch(anyhow::Error),
}

/// One inbound report request: raw query parameters plus its effective settings.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub dashboard_uid: String,
    pub parameters: Variables,
    pub credentials: Credentials,
    pub settings: Arc<Settings>,
}

#[derive(Debug)]
pub struct Report {
    pub uid: String,
    pub title: String,
    pub panels: Vec<(Panel, RenderResult)>,
}

#[derive(Clone)]
pub struct ReportService {
    repository: Arc<dyn DashboardRepository>,
    renderer: PanelRenderer,
    base_url: Url,
}

impl ReportService {
    pub fn new(repository: Arc<dyn DashboardRepository>, renderer: PanelRenderer, base_url: Url) -> Self {
        Self {
            repository,
            renderer,
            base_url,
        }
    }

    pub async fn generate(&self, request: ReportRequest) -> Result<Report, ReportError> {
        let dashboard = self
            .repository
            .fetch_dashboard(&request.dashboard_uid, &request.credentials)
            .await
            .map_err(ReportError::DashboardFetch)?;

        let deadline = Instant::now() + request.settings.report_timeout();
        let panels = self.render(&dashboard, &request, deadline).await?;

        Ok(Report {
            uid: dashboard.uid,
            title: dashboard.title,
            panels,
        })
    }

    /// Render every selected panel of `dashboard`. Results are in flattened dashboard order.
    ///
    /// Panels still unfinished at `deadline` come back as `Timeout` errors in their slots;
    /// panels finished before it are kept.
    pub async fn render(
        &self,
        dashboard: &Dashboard,
        request: &ReportRequest,
        deadline: Instant,
    ) -> Result<Vec<(Panel, RenderResult)>, ReportError> {
        let started = StdInstant::now();
        let settings = request.settings.clone();
        let classified = classify(&request.parameters);

        let mut variables = dashboard.variables.clone();
        variables.override_with(&classified.template_variables);
        let time_range = TimeRange::resolve(
            classified.control.get("from"),
            classified.control.get("to"),
            dashboard.time_range.as_ref(),
        );

        let panels = select_panels(dashboard, &settings);
        tracing::info!(
            dashboard = %dashboard.uid,
            panels = panels.len(),
            variables = variables.len(),
            native = settings.native_rendering,
            "Rendering report"
        );

        let ctx = Arc::new(RenderContext {
            base_url: self.base_url.clone(),
            dashboard_uid: dashboard.uid.clone(),
            variables,
            time_range,
            settings: settings.clone(),
            credentials: request.credentials.clone(),
            deadline,
        });
        let pools = WorkerPools::new(settings.max_browser_workers, settings.max_render_workers);
        let scheduler = Scheduler::new(self.renderer.clone(), pools);

        let results = scheduler.run(ctx, panels.clone()).await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        tracing::info!(
            dashboard = %dashboard.uid,
            rendered = results.len() - failed,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report rendered"
        );

        Ok(panels.into_iter().zip(results).collect())
    }
}

/// Flattened panels after dashboard mode and the include/exclude lists are applied.
pub fn select_panels(dashboard: &Dashboard, settings: &Settings) -> Vec<Panel> {
    dashboard
        .flatten(settings.dashboard_mode)
        .into_iter()
        .filter(|p| settings.include_panel_ids.is_empty() || settings.include_panel_ids.contains(&p.id))
        .filter(|p| !settings.exclude_panel_ids.contains(&p.id))
        .collect()
}
