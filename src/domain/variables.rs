// Ordered query-parameter multi-map and time range

/// Ordered name/value pairs. Repeated names keep every value in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(Vec<(String, String)>);

impl Variables {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces every name present in `other` with `other`'s values.
    pub fn override_with(&mut self, other: &Variables) {
        if other.is_empty() {
            return;
        }
        self.0.retain(|(name, _)| !other.has(name));
        self.0.extend(other.0.iter().cloned());
    }
}

impl From<Vec<(String, String)>> for Variables {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl FromIterator<(String, String)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub const DEFAULT_TIME_FROM: &str = "now-6h";
pub const DEFAULT_TIME_TO: &str = "now";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Request bounds win, then the dashboard's saved range, then the defaults.
    pub fn resolve(from: Option<&str>, to: Option<&str>, saved: Option<&TimeRange>) -> Self {
        let saved_from = saved.map(|r| r.from.as_str()).unwrap_or(DEFAULT_TIME_FROM);
        let saved_to = saved.map(|r| r.to.as_str()).unwrap_or(DEFAULT_TIME_TO);
        Self::new(from.unwrap_or(saved_from), to.unwrap_or(saved_to))
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FROM, DEFAULT_TIME_TO)
    }
}
