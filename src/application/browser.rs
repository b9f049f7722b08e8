// Browser automation capability used by native rendering.
//
// The browser process and tab lifecycle live outside this crate; the renderer only
// needs to open a tab, navigate, screenshot and close.
use crate::domain::enricher::Credentials;
use crate::domain::render::{Canvas, RenderError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tokio::time::Instant;

#[async_trait]
pub trait BrowserPool: Send + Sync {
    /// Open a tab that sends `credentials` with its page loads.
    async fn open_tab(&self, credentials: &Credentials) -> Result<Box<dyn BrowserTab>, RenderError>;
}

/// A tab exclusively owned by one render attempt.
///
/// Implementations must release the tab when dropped, since a cancelled report
/// drops in-flight attempts without calling [`BrowserTab::close`].
#[async_trait]
pub trait BrowserTab: Send {
    /// Load `url` with a `canvas`-sized viewport and wait until panels report rendered.
    async fn navigate(&mut self, url: &Url, canvas: Canvas, deadline: Instant) -> Result<(), RenderError>;

    async fn screenshot(&mut self) -> Result<Bytes, RenderError>;

    async fn close(self: Box<Self>);
}
