// Repository trait for dashboard document access
use crate::domain::dashboard::Dashboard;
use crate::domain::enricher::Credentials;
use async_trait::async_trait;

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Fetch and parse the dashboard identified by `uid`.
    async fn fetch_dashboard(&self, uid: &str, credentials: &Credentials) -> anyhow::Result<Dashboard>;
}
