// Mapper from the dashboard API document to domain models
use crate::domain::dashboard::{Dashboard, GridPos, Panel, Row, RowOrPanel};
use crate::domain::variables::{TimeRange, Variables};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct DashboardEnvelope {
    pub dashboard: DashboardJson,
}

#[derive(Debug, Deserialize)]
pub struct DashboardJson {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub panels: Vec<PanelJson>,
    #[serde(default)]
    pub time: Option<TimeJson>,
    #[serde(default)]
    pub templating: TemplatingJson,
}

#[derive(Debug, Deserialize)]
pub struct PanelJson {
    #[serde(default)]
    pub id: Value,
    #[serde(default, rename = "type")]
    pub panel_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "gridPos")]
    pub grid_pos: GridPosJson,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub panels: Vec<PanelJson>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridPosJson {
    #[serde(default)]
    pub x: Value,
    #[serde(default)]
    pub y: Value,
    #[serde(default)]
    pub w: Value,
    #[serde(default)]
    pub h: Value,
}

#[derive(Debug, Deserialize)]
pub struct TimeJson {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplatingJson {
    #[serde(default)]
    pub list: Vec<VariableJson>,
}

#[derive(Debug, Deserialize)]
pub struct VariableJson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current: Option<CurrentJson>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentJson {
    #[serde(default)]
    pub value: Value,
}

/// `fallback_uid` is used when the document omits its own uid.
pub fn dashboard_from_json(doc: DashboardJson, fallback_uid: &str) -> Dashboard {
    let nodes = doc.panels.into_iter().map(node_from_json).collect();
    let mut dashboard = Dashboard::new(
        doc.uid.filter(|uid| !uid.is_empty()).unwrap_or_else(|| fallback_uid.to_string()),
        doc.title,
        nodes,
    );
    dashboard.time_range = doc.time.map(|t| TimeRange::new(t.from, t.to));
    dashboard.variables = saved_variables(doc.templating);
    dashboard
}

/// Saved selections as `var-<name>` pairs. Multi-value selections keep one pair per value.
fn saved_variables(templating: TemplatingJson) -> Variables {
    let mut variables = Variables::new();
    for var in templating.list.into_iter().filter(|v| !v.name.is_empty()) {
        let Some(current) = var.current else { continue };
        let name = format!("var-{}", var.name);
        match current.value {
            Value::Array(values) => {
                for value in values.iter().filter_map(scalar) {
                    variables.add(name.as_str(), value);
                }
            }
            value => {
                if let Some(value) = scalar(&value) {
                    variables.add(name, value);
                }
            }
        }
    }
    variables
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn node_from_json(node: PanelJson) -> RowOrPanel {
    if node.panel_type == "row" {
        RowOrPanel::Row(Row {
            title: node.title,
            collapsed: node.collapsed,
            panels: node.panels.into_iter().map(panel_from_json).collect(),
        })
    } else {
        RowOrPanel::Panel(panel_from_json(node))
    }
}

fn panel_from_json(panel: PanelJson) -> Panel {
    let grid_pos = GridPos {
        x: grid_units(&panel.grid_pos.x),
        y: grid_units(&panel.grid_pos.y),
        w: grid_units(&panel.grid_pos.w),
        h: grid_units(&panel.grid_pos.h),
    };
    Panel::new(panel_id(&panel.id), panel.panel_type, panel.title, grid_pos)
}

/// Panel ids arrive as numbers or strings depending on the dashboard version.
fn panel_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn grid_units(value: &Value) -> u32 {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .map(|v| v.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}
