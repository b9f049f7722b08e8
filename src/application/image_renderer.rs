// Image-rendering service seam
use crate::domain::enricher::{Credentials, RedirectHook};
use crate::domain::render::{PanelImage, RenderError};
use async_trait::async_trait;
use reqwest::Url;

#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// GET `url` and return the image body. `redirect_hook` runs on every redirect hop.
    async fn fetch_image(
        &self,
        url: Url,
        credentials: &Credentials,
        redirect_hook: &dyn RedirectHook,
    ) -> Result<PanelImage, RenderError>;
}
