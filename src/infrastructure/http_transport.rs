// Image-rendering service client with redirect interception
use crate::application::image_renderer::ImageRenderer;
use crate::domain::enricher::{Credentials, RedirectHook};
use crate::domain::render::{PanelImage, RenderError};
use crate::infrastructure::config::Settings;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Url};
use std::time::Duration;

/// Transport safety limit on followed redirects per request.
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Shared HTTP client for every outbound call to the monitoring frontend.
///
/// Automatic redirects are disabled: hops are followed by hand so a
/// [`RedirectHook`] can rewrite each one first.
pub fn build_client(settings: &Settings) -> anyhow::Result<Client> {
    Client::builder()
        .danger_accept_invalid_certs(settings.skip_tls_check)
        .timeout(settings.attempt_timeout())
        .connect_timeout(settings.connect_timeout())
        .tcp_keepalive(Duration::from_secs(settings.http_keep_alive))
        .pool_idle_timeout(Duration::from_secs(settings.http_idle_conn_timeout))
        .pool_max_idle_per_host(settings.http_max_idle_conns_per_host)
        .redirect(redirect::Policy::none())
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Debug, Clone)]
pub struct HttpImageRenderer {
    client: Client,
}

impl HttpImageRenderer {
    #[cfg(test)]
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::with_client(build_client(settings)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageRenderer for HttpImageRenderer {
    async fn fetch_image(
        &self,
        url: Url,
        credentials: &Credentials,
        redirect_hook: &dyn RedirectHook,
    ) -> Result<PanelImage, RenderError> {
        let origin = url.origin();
        let mut current = url;
        let mut hops = 0;

        loop {
            let mut request = self.client.get(current.clone());
            // Credentials only travel to the origin they were issued for.
            if let Some(auth) = credentials.authorization() {
                if current.origin() == origin {
                    request = request.header(AUTHORIZATION, auth);
                }
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_redirection() {
                if hops == MAX_REDIRECT_HOPS {
                    return Err(RenderError::TooManyRedirects(hops));
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RenderError::InvalidRedirect(format!("status {} without location", status)))?;
                let mut next = current
                    .join(location)
                    .map_err(|e| RenderError::InvalidRedirect(e.to_string()))?;
                redirect_hook.on_redirect(&mut next);

                tracing::debug!(from = %current, to = %next, hop = hops + 1, "Following render redirect");
                current = next;
                hops += 1;
                continue;
            }

            if !status.is_success() {
                return Err(RenderError::Status {
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if !content_type.as_deref().is_some_and(|ct| ct.starts_with("image/")) {
                tracing::warn!(url = %current, content_type = ?content_type, "Render response is not an image");
                return Err(RenderError::UnexpectedContentType(
                    content_type.unwrap_or_else(|| "none".to_string()),
                ));
            }

            let bytes = response.bytes().await?;
            return Ok(PanelImage::new(bytes, content_type));
        }
    }
}
