// Custom query parameters and credentials applied to outbound panel requests
use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Operator-configured query parameters added to every panel request.
pub type CustomQueryParams = BTreeMap<String, String>;

/// Overlays `params` onto the URL query. Same-named parameters are replaced, not duplicated.
pub fn apply_custom_params(url: &mut Url, params: &CustomQueryParams) {
    if params.is_empty() {
        return;
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !params.contains_key(name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    for (name, value) in &retained {
        query.append_pair(name, value);
    }
    for (name, value) in params {
        query.append_pair(name, value);
    }
}

/// Invoked by the transport on each redirect hop before it is followed.
pub trait RedirectHook: Send + Sync {
    fn on_redirect(&self, url: &mut Url);
}

/// Reapplies the full custom parameter set to every redirected request.
#[derive(Debug, Clone, Default)]
pub struct ReapplyCustomParams {
    params: Arc<CustomQueryParams>,
}

impl ReapplyCustomParams {
    pub fn new(params: Arc<CustomQueryParams>) -> Self {
        Self { params }
    }
}

impl RedirectHook for ReapplyCustomParams {
    fn on_redirect(&self, url: &mut Url) {
        apply_custom_params(url, &self.params);
    }
}

/// Value for the `Authorization` header of outbound render requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    authorization: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    /// Uses a full header value as received, e.g. `Bearer abc`.
    pub fn from_header(value: impl Into<String>) -> Self {
        Self {
            authorization: Some(value.into()),
        }
    }

    pub fn bearer(token: &str) -> Self {
        Self::from_header(format!("Bearer {}", token))
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.authorization.as_ref().map(|_| "[redacted]");
        f.debug_struct("Credentials").field("authorization", &shown).finish()
    }
}
