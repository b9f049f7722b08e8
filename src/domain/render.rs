// Render targets, per-panel results and the per-panel error taxonomy
use bytes::Bytes;
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which execution path produces a panel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// External image-rendering service reached over HTTP.
    ImageService,
    /// Headless browser tab navigated to the live panel view.
    NativeBrowser,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::ImageService => f.write_str("image-service"),
            Backend::NativeBrowser => f.write_str("native-browser"),
        }
    }
}

/// Pixel size requested for a panel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Rebuilt on every attempt so retries pick up freshly resolved parameters.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub url: Url,
    pub canvas: Canvas,
    pub backend: Backend,
}

#[derive(Debug, Clone)]
pub struct PanelImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl PanelImage {
    pub fn new(bytes: Bytes, content_type: Option<String>) -> Self {
        Self { bytes, content_type }
    }

    pub fn png(bytes: Bytes) -> Self {
        Self::new(bytes, Some("image/png".to_string()))
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render service responded with status {status}")]
    Status { status: u16 },

    #[error("render request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("render attempt exceeded {0:?}")]
    Timeout(Duration),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("render service returned non-image content type {0}")]
    UnexpectedContentType(String),

    #[error("invalid panel url: {0}")]
    InvalidUrl(String),

    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("gave up after {0} redirects")]
    TooManyRedirects(usize),

    #[error("native rendering requested but no browser is attached")]
    BrowserUnavailable,

    #[error("render task aborted: {0}")]
    Aborted(String),
}

impl RenderError {
    /// Transient failures are retried; everything else ends the panel immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::Status { .. }
                | RenderError::Transport(_)
                | RenderError::Timeout(_)
                | RenderError::Browser(_)
                | RenderError::UnexpectedContentType(_)
        )
    }
}

/// Outcome of rendering one panel, created once by the renderer and handed to the assembler.
#[derive(Debug)]
pub struct RenderResult {
    pub panel_id: String,
    pub outcome: Result<PanelImage, RenderError>,
    pub attempts: u32,
}

impl RenderResult {
    pub fn rendered(panel_id: String, image: PanelImage, attempts: u32) -> Self {
        Self {
            panel_id,
            outcome: Ok(image),
            attempts,
        }
    }

    pub fn failed(panel_id: String, error: RenderError, attempts: u32) -> Self {
        Self {
            panel_id,
            outcome: Err(error),
            attempts,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
