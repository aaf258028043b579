use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROMETHEUS_DS_TYPE: &str = "prometheus";
pub const PROMETHEUS_DS_UID: &str = "prom";

pub const LOKI_DS_TYPE: &str = "loki";
pub const LOKI_DS_UID: &str = "loki";

/// Width of the dashboard grid in layout units
pub const GRID_WIDTH: u32 = 24;

/// Variable refresh trigger: re-evaluate when the dashboard loads
pub const REFRESH_ON_DASHBOARD_LOAD: u8 = 1;

/// Grafana dashboard definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub title: String,
    pub uid: String,
    pub tags: Vec<String>,
    pub timezone: String,
    pub editable: bool,
    pub graph_tooltip: u8,
    pub time: TimeRange,
    pub refresh: String,
    pub schema_version: u32,
    pub templating: Templating,
    pub panels: Vec<Panel>,
}

impl Dashboard {
    /// Row headers in layout order
    pub fn rows(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter().filter(|p| p.panel_type == PanelType::Row)
    }

    pub fn panel(&self, title: &str) -> Option<&Panel> {
        self.panels
            .iter()
            .find(|p| p.panel_type != PanelType::Row && p.title == title)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.templating.list.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Templating {
    pub list: Vec<Variable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Datasource,
    Query,
}

/// Templating variable, either a datasource selector or a query backed filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(rename = "type")]
    pub variable_type: VariableType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    #[serde(rename = "type")]
    pub ds_type: String,
    pub uid: String,
}

impl DataSourceRef {
    /// Reference resolved through a datasource selector variable
    pub fn variable(ds_type: &str, variable: &str) -> Self {
        Self {
            ds_type: ds_type.to_string(),
            uid: format!("${{{variable}}}"),
        }
    }

    pub fn prometheus() -> Self {
        Self::variable(PROMETHEUS_DS_TYPE, PROMETHEUS_DS_UID)
    }

    pub fn loki() -> Self {
        Self::variable(LOKI_DS_TYPE, LOKI_DS_UID)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelType {
    Row,
    Timeseries,
    Table,
    Logs,
}

/// A panel or a row header. Rows carry `collapsed` and an empty `panels`
/// list, everything else carries targets and display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    #[serde(rename = "type")]
    pub panel_type: PanelType,
    pub id: u32,
    pub title: String,
    pub grid_pos: GridPos,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_config: Option<FieldConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<Transformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panels: Option<Vec<Panel>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub h: u32,
    pub w: u32,
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn sized(w: u32, h: u32) -> Self {
        Self { h, w, x: 0, y: 0 }
    }
}

impl Default for GridPos {
    fn default() -> Self {
        Self::sized(12, 9)
    }
}

/// A single query attached to a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub datasource: DataSourceRef,
    pub expr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<bool>,
    pub ref_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub defaults: FieldDefaults,
    pub overrides: Vec<FieldOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    pub matcher: Matcher,
    pub properties: Vec<Property>,
}

impl FieldOverride {
    /// Override applied to the field with the given display name
    pub fn by_name(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            matcher: Matcher {
                id: "byName".to_string(),
                options: name.into(),
            },
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matcher {
    pub id: String,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub value: Value,
}

impl Property {
    pub fn unit(unit: &str) -> Self {
        Self {
            id: "unit".to_string(),
            value: Value::String(unit.to_string()),
        }
    }

    pub fn color(color: FieldColor) -> Self {
        Self {
            id: "color".to_string(),
            value: serde_json::json!({
                "mode": color.mode.as_str(),
                "fixedColor": color.fixed_color,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Fixed,
    Shades,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Shades => "shades",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldColor {
    pub mode: ColorMode,
    pub fixed_color: String,
}

impl FieldColor {
    pub fn fixed(color: &str) -> Self {
        Self {
            mode: ColorMode::Fixed,
            fixed_color: color.to_string(),
        }
    }

    pub fn shades(color: &str) -> Self {
        Self {
            mode: ColorMode::Shades,
            fixed_color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    pub options: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBy {
    pub display_name: String,
    pub desc: bool,
}
