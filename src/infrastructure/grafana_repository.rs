// Dashboard repository backed by the monitoring frontend's HTTP API
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::dashboard::Dashboard;
use crate::domain::enricher::Credentials;
use crate::infrastructure::dashboard_mapper::{dashboard_from_json, DashboardEnvelope};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};

#[derive(Debug, Clone)]
pub struct GrafanaRepository {
    base_url: Url,
    client: Client,
}

impl GrafanaRepository {
    pub fn new(base_url: Url, client: Client) -> Self {
        Self { base_url, client }
    }

    fn dashboard_url(&self, uid: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = format!("{}/api/dashboards/uid/{}", base, urlencoding::encode(uid));
        Url::parse(&url).context("Failed to build dashboard URL")
    }
}

#[async_trait]
impl DashboardRepository for GrafanaRepository {
    async fn fetch_dashboard(&self, uid: &str, credentials: &Credentials) -> Result<Dashboard> {
        let url = self.dashboard_url(uid)?;
        tracing::debug!("Fetching dashboard {} from {}", uid, url);

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(auth) = credentials.authorization() {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to dashboard API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Dashboard API responded with status {}: {}", status, body);
        }

        let envelope = response
            .json::<DashboardEnvelope>()
            .await
            .context("Failed to parse dashboard document")?;

        Ok(dashboard_from_json(envelope.dashboard, uid))
    }
}
