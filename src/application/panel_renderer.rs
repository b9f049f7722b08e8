// Panel renderer - One panel image via the image service or a browser tab, with retry
use crate::application::browser::BrowserPool;
use crate::application::image_renderer::ImageRenderer;
use crate::domain::dashboard::Panel;
use crate::domain::enricher::{apply_custom_params, Credentials, ReapplyCustomParams};
use crate::domain::layout::{build_canonical_url, compute_canvas, SoloView};
use crate::domain::render::{Backend, PanelImage, RenderError, RenderResult, RenderTarget};
use crate::domain::variables::{TimeRange, Variables};
use crate::infrastructure::config::Settings;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.panel_max_attempts.max(1),
            delay: settings.retry_delay(),
            attempt_timeout: settings.attempt_timeout(),
        }
    }
}

/// Everything a panel render needs from the report request. Read-only while rendering.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub base_url: Url,
    pub dashboard_uid: String,
    pub variables: Variables,
    pub time_range: TimeRange,
    pub settings: Arc<Settings>,
    pub credentials: Credentials,
    /// Report deadline. No attempt runs past it and no retry starts after it.
    pub deadline: Instant,
}

impl RenderContext {
    pub fn backend(&self) -> Backend {
        if self.settings.native_rendering {
            Backend::NativeBrowser
        } else {
            Backend::ImageService
        }
    }
}

#[derive(Clone)]
pub struct PanelRenderer {
    images: Arc<dyn ImageRenderer>,
    browser: Option<Arc<dyn BrowserPool>>,
    retry: RetryPolicy,
}

impl PanelRenderer {
    pub fn new(
        images: Arc<dyn ImageRenderer>,
        browser: Option<Arc<dyn BrowserPool>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            images,
            browser,
            retry,
        }
    }

    /// Canvas, canonical URL and custom parameters for one attempt.
    pub fn resolve_target(ctx: &RenderContext, panel: &Panel) -> Result<RenderTarget, RenderError> {
        let backend = ctx.backend();
        let canvas = compute_canvas(panel, ctx.settings.layout);
        let view = SoloView {
            dashboard_uid: &ctx.dashboard_uid,
            variables: &ctx.variables,
            time_range: &ctx.time_range,
            theme: ctx.settings.theme,
        };
        let mut url = build_canonical_url(&ctx.base_url, &view, panel, canvas, backend)?;
        apply_custom_params(&mut url, &ctx.settings.custom_query_params);

        Ok(RenderTarget { url, canvas, backend })
    }

    /// Render `panel`, retrying transient failures. Never fails as a whole:
    /// an exhausted panel comes back as a failed [`RenderResult`].
    pub async fn render_panel(&self, ctx: &RenderContext, panel: &Panel) -> RenderResult {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.render_once(ctx, panel).await {
                Ok(image) => {
                    tracing::debug!(panel_id = %panel.id, attempt, bytes = image.bytes.len(), "Panel rendered");
                    return RenderResult::rendered(panel.id.clone(), image, attempt);
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts && self.can_retry(ctx) => {
                    tracing::warn!(
                        panel_id = %panel.id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        "Panel render failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(err) => {
                    tracing::error!(panel_id = %panel.id, attempt, "Panel render failed: {}", err);
                    return RenderResult::failed(panel.id.clone(), err, attempt);
                }
            }
        }
    }

    /// A retry is worth starting only if the report deadline is still ahead after the delay.
    fn can_retry(&self, ctx: &RenderContext) -> bool {
        Instant::now() + self.retry.delay < ctx.deadline
    }

    async fn render_once(&self, ctx: &RenderContext, panel: &Panel) -> Result<PanelImage, RenderError> {
        let now = Instant::now();
        let deadline = (now + self.retry.attempt_timeout).min(ctx.deadline);
        let limit = deadline.saturating_duration_since(now);
        if limit.is_zero() {
            return Err(RenderError::Timeout(limit));
        }

        let target = Self::resolve_target(ctx, panel)?;
        tracing::debug!(panel_id = %panel.id, backend = %target.backend, url = %target.url, "Rendering panel");

        let attempt = async {
            match target.backend {
                Backend::ImageService => {
                    let hook = ReapplyCustomParams::new(Arc::new(ctx.settings.custom_query_params.clone()));
                    self.images
                        .fetch_image(target.url.clone(), &ctx.credentials, &hook)
                        .await
                }
                Backend::NativeBrowser => self.capture(&target, &ctx.credentials, deadline).await,
            }
        };

        tokio::time::timeout_at(deadline, attempt)
            .await
            .map_err(|_| RenderError::Timeout(limit))?
    }

    async fn capture(
        &self,
        target: &RenderTarget,
        credentials: &Credentials,
        deadline: Instant,
    ) -> Result<PanelImage, RenderError> {
        let browser = self.browser.as_ref().ok_or(RenderError::BrowserUnavailable)?;
        let mut tab = browser.open_tab(credentials).await?;

        let captured = match tab.navigate(&target.url, target.canvas, deadline).await {
            Ok(()) => tab.screenshot().await,
            Err(err) => Err(err),
        };
        tab.close().await;

        let bytes = captured?;
        if bytes.is_empty() {
            return Err(RenderError::Browser("screenshot is empty".to_string()));
        }
        Ok(PanelImage::png(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::GridPos;
    use crate::domain::layout::LayoutMode;
    use crate::test_support::{context_for, fast_retry, spawn_server, FakeBrowser};
    use crate::infrastructure::http_transport::HttpImageRenderer;
    use axum::extract::{OriginalUri, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        uris: Mutex<Vec<String>>,
        auth: Mutex<Vec<Option<String>>>,
        calls: AtomicUsize,
        failures_before_success: usize,
    }

    async fn render_endpoint(
        State(rec): State<Arc<Recorded>>,
        OriginalUri(uri): OriginalUri,
        headers: HeaderMap,
    ) -> (StatusCode, [(&'static str, &'static str); 1], Vec<u8>) {
        rec.uris.lock().unwrap().push(uri.to_string());
        rec.auth.lock().unwrap().push(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
        let call = rec.calls.fetch_add(1, Ordering::SeqCst);
        if call < rec.failures_before_success {
            (StatusCode::SERVICE_UNAVAILABLE, [("content-type", "text/plain")], Vec::new())
        } else {
            (StatusCode::OK, [("content-type", "image/png")], b"\x89PNG".to_vec())
        }
    }

    async fn start(failures_before_success: usize) -> (Url, Arc<Recorded>) {
        let rec = Arc::new(Recorded {
            failures_before_success,
            ..Default::default()
        });
        let router = Router::new()
            .route("/render/d-solo/:uid/_", get(render_endpoint))
            .with_state(rec.clone());
        (spawn_server(router).await, rec)
    }

    fn http_renderer(max_attempts: u32) -> PanelRenderer {
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        PanelRenderer::new(Arc::new(images), None, fast_retry(max_attempts))
    }

    #[tokio::test]
    async fn test_single_value_panel_request() {
        let (base, rec) = start(0).await;
        let mut ctx = context_for(&base, "testDash", Settings::default());
        ctx.variables.add("var-host", "servername");
        ctx.variables.add("var-port", "adapter");
        ctx.time_range = TimeRange::new("now-1h", "now");
        ctx.credentials = Credentials::from_header("Bearer token");

        let panel = Panel::new("44", "singlestat", "title", GridPos::default());
        let result = http_renderer(3).render_panel(&ctx, &panel).await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 1);
        let uri = rec.uris.lock().unwrap()[0].clone();
        assert!(uri.starts_with("/render/d-solo/testDash/_"));
        for expected in ["panelId=44", "width=1000", "height=500", "from=now-1h", "to=now", "var-host=servername", "var-port=adapter"] {
            assert!(uri.contains(expected), "{} missing from {}", expected, uri);
        }
        assert_eq!(rec.auth.lock().unwrap()[0].as_deref(), Some("Bearer token"));
    }

    #[tokio::test]
    async fn test_grid_layout_request_size() {
        let (base, rec) = start(0).await;
        let settings = Settings {
            layout: LayoutMode::Grid,
            ..Settings::default()
        };
        let ctx = context_for(&base, "randomUID", settings);
        let panel = Panel::new("44", "graph", "title", GridPos { x: 0, y: 0, w: 24, h: 6 });

        assert!(http_renderer(3).render_panel(&ctx, &panel).await.is_ok());
        let uri = rec.uris.lock().unwrap()[0].clone();
        assert!(uri.contains("width=1536"));
        assert!(uri.contains("height=216"));
    }

    #[tokio::test]
    async fn test_custom_params_in_render_url() {
        let (base, rec) = start(0).await;
        let mut settings = Settings::default();
        settings.custom_query_params.insert("c_query_test".to_string(), "checked".to_string());
        settings.custom_query_params.insert("another_param".to_string(), "value123".to_string());
        let ctx = context_for(&base, "testUID", settings);
        let panel = Panel::new("44", "singlestat", "title", GridPos::default());

        assert!(http_renderer(3).render_panel(&ctx, &panel).await.is_ok());
        let uri = rec.uris.lock().unwrap()[0].clone();
        assert!(uri.starts_with("/render/d-solo/testUID/_"));
        assert!(uri.contains("c_query_test=checked"));
        assert!(uri.contains("another_param=value123"));
        assert!(uri.contains("panelId=44"));
    }

    #[tokio::test]
    async fn test_retries_after_transient_failure() {
        let (base, rec) = start(1).await;
        let ctx = context_for(&base, "uid", Settings::default());
        let panel = Panel::new("7", "graph", "title", GridPos::default());

        let result = http_renderer(3).render_panel(&ctx, &panel).await;
        assert!(result.is_ok());
        assert_eq!(result.attempts, 2);
        assert_eq!(rec.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_panel_error() {
        let (base, rec) = start(usize::MAX).await;
        let ctx = context_for(&base, "uid", Settings::default());
        let panel = Panel::new("7", "graph", "title", GridPos::default());

        let result = http_renderer(3).render_panel(&ctx, &panel).await;
        assert_eq!(result.attempts, 3);
        assert!(matches!(result.outcome, Err(RenderError::Status { status: 503 })));
        assert_eq!(rec.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        let ctx = context_for(&Url::parse("http://grafana.local").unwrap(), "uid", settings);
        let panel = Panel::new("7", "graph", "title", GridPos::default());

        let result = http_renderer(3).render_panel(&ctx, &panel).await;
        assert_eq!(result.attempts, 1);
        assert!(matches!(result.outcome, Err(RenderError::BrowserUnavailable)));
    }

    #[tokio::test]
    async fn test_native_rendering_navigates_bare_view_with_custom_params() {
        let browser = Arc::new(FakeBrowser::default());
        let mut settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        settings.custom_query_params.insert("c_query_test".to_string(), "checked".to_string());
        settings.custom_query_params.insert("chrome_param".to_string(), "native_value".to_string());
        let mut ctx = context_for(&Url::parse("http://test-server.com").unwrap(), "chromeUID", settings);
        ctx.time_range = TimeRange::new("now-1h", "now");

        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let renderer = PanelRenderer::new(Arc::new(images), Some(browser.clone()), fast_retry(3));
        let panel = Panel::new("88", "graph", "test panel", GridPos::default());

        let result = renderer.render_panel(&ctx, &panel).await;
        assert!(result.is_ok());

        let navigated = browser.navigated();
        assert_eq!(navigated.len(), 1);
        let url = &navigated[0];
        assert!(url.contains("d-solo/chromeUID/_"));
        assert!(!url.contains("render/"));
        for expected in ["panelId=88", "from=now-1h", "to=now", "c_query_test=checked", "chrome_param=native_value"] {
            assert!(url.contains(expected), "{} missing from {}", expected, url);
        }
        assert_eq!(browser.open_tabs(), 0);
    }

    #[tokio::test]
    async fn test_browser_navigation_timeout_is_retried() {
        let browser = Arc::new(FakeBrowser::failing_first(1));
        let settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        let ctx = context_for(&Url::parse("http://grafana.local").unwrap(), "uid", settings);
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let renderer = PanelRenderer::new(Arc::new(images), Some(browser.clone()), fast_retry(3));
        let panel = Panel::new("1", "graph", "title", GridPos::default());

        let result = renderer.render_panel(&ctx, &panel).await;
        assert!(result.is_ok());
        assert_eq!(result.attempts, 2);
        assert_eq!(browser.open_tabs(), 0);
    }

    #[tokio::test]
    async fn test_attempt_deadline_counts_as_transient() {
        let router = Router::new().route(
            "/render/d-solo/:uid/_",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                (StatusCode::OK, [("content-type", "image/png")])
            }),
        );
        let base = spawn_server(router).await;
        let ctx = context_for(&base, "uid", Settings::default());
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let retry = RetryPolicy {
            attempt_timeout: Duration::from_millis(50),
            ..fast_retry(2)
        };
        let renderer = PanelRenderer::new(Arc::new(images), None, retry);
        let panel = Panel::new("1", "graph", "title", GridPos::default());

        let result = renderer.render_panel(&ctx, &panel).await;
        assert_eq!(result.attempts, 2);
        assert!(matches!(result.outcome, Err(RenderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_empty_screenshot_is_retried_as_browser_failure() {
        let browser = Arc::new(FakeBrowser::blank_screenshots());
        let settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        let ctx = context_for(&Url::parse("http://grafana.local").unwrap(), "uid", settings);
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let renderer = PanelRenderer::new(Arc::new(images), Some(browser.clone()), fast_retry(2));
        let panel = Panel::new("1", "graph", "title", GridPos::default());

        let result = renderer.render_panel(&ctx, &panel).await;
        assert_eq!(result.attempts, 2);
        assert!(matches!(result.outcome, Err(RenderError::Browser(_))));
        assert_eq!(browser.open_tabs(), 0);
    }

    #[tokio::test]
    async fn test_attempt_is_capped_by_report_deadline() {
        let browser = Arc::new(FakeBrowser::with_delays(vec![("panelId=3", Duration::from_secs(10))]));
        let settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        let mut ctx = context_for(&Url::parse("http://grafana.local").unwrap(), "uid", settings);
        ctx.deadline = Instant::now() + Duration::from_millis(100);
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let renderer = PanelRenderer::new(Arc::new(images), Some(browser.clone()), fast_retry(3));
        let panel = Panel::new("3", "graph", "title", GridPos::default());

        let started = Instant::now();
        let result = renderer.render_panel(&ctx, &panel).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.attempts, 1);
        assert!(matches!(result.outcome, Err(RenderError::Timeout(_))));
        assert_eq!(browser.open_tabs(), 0);
    }

    #[tokio::test]
    async fn test_no_retry_sleep_past_report_deadline() {
        let browser = Arc::new(FakeBrowser::failing_first(usize::MAX));
        let settings = Settings {
            native_rendering: true,
            ..Settings::default()
        };
        let mut ctx = context_for(&Url::parse("http://grafana.local").unwrap(), "uid", settings);
        ctx.deadline = Instant::now() + Duration::from_millis(500);
        let images = HttpImageRenderer::new(&Settings::default()).unwrap();
        let retry = RetryPolicy {
            delay: Duration::from_secs(5),
            ..fast_retry(3)
        };
        let renderer = PanelRenderer::new(Arc::new(images), Some(browser.clone()), retry);
        let panel = Panel::new("1", "graph", "title", GridPos::default());

        let started = Instant::now();
        let result = renderer.render_panel(&ctx, &panel).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.attempts, 1);
        assert!(matches!(result.outcome, Err(RenderError::Browser(_))));
        assert_eq!(browser.navigated().len(), 1);
    }
}
