// Shared helpers for in-crate tests
use crate::application::browser::{BrowserPool, BrowserTab};
use crate::application::panel_renderer::{RenderContext, RetryPolicy};
use crate::domain::enricher::Credentials;
use crate::domain::render::{Canvas, RenderError};
use crate::domain::variables::{TimeRange, Variables};
use crate::infrastructure::config::Settings;
use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use reqwest::Url;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{}", addr)).unwrap()
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::from_millis(1),
        attempt_timeout: Duration::from_secs(5),
    }
}

pub fn context_for(base: &Url, uid: &str, settings: Settings) -> RenderContext {
    RenderContext {
        base_url: base.clone(),
        dashboard_uid: uid.to_string(),
        variables: Variables::new(),
        time_range: TimeRange::default(),
        settings: Arc::new(settings),
        credentials: Credentials::none(),
        deadline: Instant::now() + Duration::from_secs(60),
    }
}

#[derive(Default)]
struct TabCounters {
    open: AtomicUsize,
    peak: AtomicUsize,
    navigations: AtomicUsize,
}

/// In-memory browser that records navigations and tracks open tabs.
#[derive(Default)]
pub struct FakeBrowser {
    navigated: Arc<Mutex<Vec<String>>>,
    counters: Arc<TabCounters>,
    delays: Vec<(String, Duration)>,
    failures: usize,
    blank: bool,
}

impl FakeBrowser {
    /// Navigations whose URL contains the pattern take the paired delay.
    pub fn with_delays(delays: Vec<(&str, Duration)>) -> Self {
        Self {
            delays: delays
                .into_iter()
                .map(|(pattern, delay)| (pattern.to_string(), delay))
                .collect(),
            ..Self::default()
        }
    }

    /// The first `failures` navigations fail like a readiness timeout.
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Every screenshot comes back with no bytes.
    pub fn blank_screenshots() -> Self {
        Self {
            blank: true,
            ..Self::default()
        }
    }

    pub fn navigated(&self) -> Vec<String> {
        self.navigated.lock().unwrap().clone()
    }

    pub fn open_tabs(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_tabs(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserPool for FakeBrowser {
    async fn open_tab(&self, _credentials: &Credentials) -> Result<Box<dyn BrowserTab>, RenderError> {
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(FakeTab {
            navigated: self.navigated.clone(),
            counters: self.counters.clone(),
            delays: self.delays.clone(),
            failures: self.failures,
            blank: self.blank,
        }))
    }
}

struct FakeTab {
    navigated: Arc<Mutex<Vec<String>>>,
    counters: Arc<TabCounters>,
    delays: Vec<(String, Duration)>,
    failures: usize,
    blank: bool,
}

#[async_trait]
impl BrowserTab for FakeTab {
    async fn navigate(&mut self, url: &Url, _canvas: Canvas, _deadline: Instant) -> Result<(), RenderError> {
        self.navigated.lock().unwrap().push(url.to_string());
        let delay = self
            .delays
            .iter()
            .find(|(pattern, _)| url.as_str().contains(pattern.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.counters.navigations.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(RenderError::Browser("timed out waiting for panels".to_string()));
        }
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Bytes, RenderError> {
        if self.blank {
            return Ok(Bytes::new());
        }
        Ok(Bytes::from_static(b"\x89PNG"))
    }

    async fn close(self: Box<Self>) {}
}

impl Drop for FakeTab {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
    }
}
