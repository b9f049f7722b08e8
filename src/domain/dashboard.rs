// Dashboard domain model
use super::variables::{TimeRange, Variables};
use serde::{Deserialize, Serialize};

/// Whether panels nested in collapsed rows take part in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardMode {
    /// Collapsed rows are skipped.
    #[default]
    Default,
    /// Collapsed rows are expanded like open ones.
    Full,
}

/// Position and size of a panel in dashboard grid units (24 columns wide).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub id: String,
    pub panel_type: String,
    pub title: String,
    pub grid_pos: GridPos,
}

impl Panel {
    pub fn new(id: impl Into<String>, panel_type: impl Into<String>, title: impl Into<String>, grid_pos: GridPos) -> Self {
        Self {
            id: id.into(),
            panel_type: panel_type.into(),
            title: title.into(),
            grid_pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub title: String,
    pub collapsed: bool,
    pub panels: Vec<Panel>,
}

/// A top-level node of the dashboard tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOrPanel {
    Row(Row),
    Panel(Panel),
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    pub variables: Variables,
    pub time_range: Option<TimeRange>,
    pub nodes: Vec<RowOrPanel>,
}

impl Dashboard {
    pub fn new(uid: String, title: String, nodes: Vec<RowOrPanel>) -> Self {
        Self {
            uid,
            title,
            variables: Variables::new(),
            time_range: None,
            nodes,
        }
    }

    /// Flattens rows into the panel sequence that defines report order.
    pub fn flatten(&self, mode: DashboardMode) -> Vec<Panel> {
        let mut panels = Vec::new();
        for node in &self.nodes {
            match node {
                RowOrPanel::Panel(panel) => panels.push(panel.clone()),
                RowOrPanel::Row(row) if row.collapsed && mode == DashboardMode::Default => {}
                RowOrPanel::Row(row) => panels.extend(row.panels.iter().cloned()),
            }
        }
        panels
    }
}
