use crate::domain::dashboard::DashboardMode;
use crate::domain::enricher::{CustomQueryParams, Credentials};
use crate::domain::layout::{LayoutMode, Theme};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "GF_REPORTER_PLUGIN";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Reporter settings. Read-only once loaded; request overrides work on a clone.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub app_url: String,
    pub skip_tls_check: bool,
    pub theme: Theme,
    pub orientation: Orientation,
    pub layout: LayoutMode,
    pub dashboard_mode: DashboardMode,
    pub native_rendering: bool,
    pub custom_query_params: CustomQueryParams,
    pub max_browser_workers: usize,
    pub max_render_workers: usize,
    pub include_panel_ids: Vec<String>,
    pub exclude_panel_ids: Vec<String>,
    pub panel_max_attempts: u32,
    pub panel_retry_delay_ms: u64,
    // Timeouts in seconds
    pub timeout: u64,
    pub report_timeout: u64,
    pub dial_timeout: u64,
    pub http_keep_alive: u64,
    pub http_tls_handshake_timeout: u64,
    pub http_idle_conn_timeout: u64,
    pub http_max_idle_conns_per_host: usize,
    pub token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            app_url: "http://localhost:3000".to_string(),
            skip_tls_check: false,
            theme: Theme::Light,
            orientation: Orientation::Portrait,
            layout: LayoutMode::Simple,
            dashboard_mode: DashboardMode::Default,
            native_rendering: false,
            custom_query_params: CustomQueryParams::new(),
            max_browser_workers: 2,
            max_render_workers: 2,
            include_panel_ids: Vec::new(),
            exclude_panel_ids: Vec::new(),
            panel_max_attempts: 3,
            panel_retry_delay_ms: 5000,
            timeout: 120,
            report_timeout: 600,
            dial_timeout: 10,
            http_keep_alive: 30,
            http_tls_handshake_timeout: 10,
            http_idle_conn_timeout: 90,
            http_max_idle_conns_per_host: 100,
            token: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("app url {0} is invalid")]
    InvalidAppUrl(String),

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.app_url).map_err(|_| ConfigError::InvalidAppUrl(self.app_url.clone()))?;
        if url.host_str().is_none() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAppUrl(self.app_url.clone()));
        }
        if self.max_browser_workers == 0 {
            return Err(ConfigError::Zero("max_browser_workers"));
        }
        if self.max_render_workers == 0 {
            return Err(ConfigError::Zero("max_render_workers"));
        }
        if self.panel_max_attempts == 0 {
            return Err(ConfigError::Zero("panel_max_attempts"));
        }
        Ok(())
    }

    pub fn app_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.app_url).map_err(|_| ConfigError::InvalidAppUrl(self.app_url.clone()))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.panel_retry_delay_ms)
    }

    /// Connect budget covers both TCP dial and TLS handshake.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout + self.http_tls_handshake_timeout)
    }

    /// Credentials used when the incoming request carries none.
    pub fn service_credentials(&self) -> Credentials {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => Credentials::bearer(token),
            _ => Credentials::none(),
        }
    }
}

/// Defaults, then `config/reporter.*` if present, then `GF_REPORTER_PLUGIN_*` env vars.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/reporter").required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("include_panel_ids")
                .with_list_parse_key("exclude_panel_ids")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
