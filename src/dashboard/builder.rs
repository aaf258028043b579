// Chained builders for dashboards, panels and variables.
//
// Builders never fail mid-chain. Problems are recorded and surface from the
// final `build()` call, so a dashboard is either complete or not produced.

use super::common::*;
use crate::error::BuildError;
use ringlog::{debug, trace};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

pub trait Builder<T> {
    fn build(self) -> Result<T, BuildError>;
}

// === Targets ===

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    datasource: DataSourceRef,
    expr: Option<String>,
    legend_format: Option<String>,
    range: Option<bool>,
    ref_id: Option<String>,
}

impl QueryBuilder {
    pub fn new(datasource: DataSourceRef) -> Self {
        Self {
            datasource,
            expr: None,
            legend_format: None,
            range: None,
            ref_id: None,
        }
    }

    pub fn prometheus() -> Self {
        Self::new(DataSourceRef::prometheus())
    }

    pub fn loki() -> Self {
        Self::new(DataSourceRef::loki())
    }

    pub fn expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    pub fn legend_format(mut self, format: impl Into<String>) -> Self {
        self.legend_format = Some(format.into());
        self
    }

    /// Evaluate as a range query rather than an instant query
    pub fn range(mut self) -> Self {
        self.range = Some(true);
        self
    }

    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }
}

/// Default refIds follow the spreadsheet column sequence: A..Z, AA, AB, ...
fn ref_id_for_index(mut index: usize) -> String {
    let mut id = Vec::new();
    loop {
        id.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

fn build_targets(panel: &str, queries: Vec<QueryBuilder>) -> Result<Vec<Target>, BuildError> {
    let mut used = BTreeSet::new();
    for query in &queries {
        if let Some(ref_id) = &query.ref_id {
            if !used.insert(ref_id.clone()) {
                return Err(BuildError::DuplicateRefId {
                    panel: panel.to_string(),
                    ref_id: ref_id.clone(),
                });
            }
        }
    }

    let mut next = 0;
    let mut targets = Vec::with_capacity(queries.len());
    for query in queries {
        let expr = query.expr.ok_or(BuildError::MissingField {
            builder: "query",
            field: "expr",
        })?;

        let ref_id = match query.ref_id {
            Some(ref_id) => ref_id,
            None => loop {
                let candidate = ref_id_for_index(next);
                next += 1;
                if used.insert(candidate.clone()) {
                    break candidate;
                }
            },
        };

        targets.push(Target {
            datasource: query.datasource,
            expr,
            legend_format: query.legend_format,
            range: query.range,
            ref_id,
        });
    }

    Ok(targets)
}

/// RefIds a transformation depends on. `timeSeriesTable` is keyed by refId
/// and `organize` addresses converted columns as `Trend #<refId>`.
fn referenced_ref_ids(transformation: &Transformation) -> Vec<String> {
    let mut ids = Vec::new();
    match transformation.id.as_str() {
        "timeSeriesTable" => {
            if let Some(options) = transformation.options.as_object() {
                ids.extend(options.keys().cloned());
            }
        }
        "organize" => {
            for key in ["excludeByName", "renameByName", "indexByName"] {
                if let Some(fields) = transformation.options.get(key).and_then(Value::as_object) {
                    ids.extend(
                        fields
                            .keys()
                            .filter_map(|field| field.strip_prefix("Trend #"))
                            .map(str::to_string),
                    );
                }
            }
        }
        _ => {}
    }
    ids
}

// === Panels ===

pub struct PanelBuilder {
    panel_type: PanelType,
    title: String,
    datasource: Option<DataSourceRef>,
    grid_pos: GridPos,
    unit: Option<String>,
    min: Option<f64>,
    targets: Vec<QueryBuilder>,
    overrides: Vec<FieldOverride>,
    transformations: Vec<Transformation>,
    options: Map<String, Value>,
}

impl PanelBuilder {
    fn new(panel_type: PanelType) -> Self {
        Self {
            panel_type,
            title: String::new(),
            datasource: None,
            grid_pos: GridPos::default(),
            unit: None,
            min: None,
            targets: Vec::new(),
            overrides: Vec::new(),
            transformations: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn timeseries() -> Self {
        Self::new(PanelType::Timeseries)
            .option(
                "legend",
                json!({"displayMode": "list", "placement": "bottom", "showLegend": true}),
            )
            .option("tooltip", json!({"mode": "single", "sort": "none"}))
    }

    pub fn table() -> Self {
        Self::new(PanelType::Table).option("showHeader", json!(true))
    }

    pub fn logs() -> Self {
        Self::new(PanelType::Logs)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = Some(datasource);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.grid_pos.h = height;
        self
    }

    pub fn grid_pos(mut self, grid_pos: GridPos) -> Self {
        self.grid_pos = grid_pos;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_target(mut self, target: QueryBuilder) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = QueryBuilder>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn overrides(mut self, overrides: Vec<FieldOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn transformations(mut self, transformations: Vec<Transformation>) -> Self {
        self.transformations = transformations;
        self
    }

    pub fn sort_by(self, sort_by: Vec<SortBy>) -> Self {
        self.option("sortBy", json!(sort_by))
    }

    pub fn enable_infinite_scrolling(self, enabled: bool) -> Self {
        self.option("enableInfiniteScrolling", json!(enabled))
    }

    pub fn option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }
}

impl Builder<Panel> for PanelBuilder {
    fn build(self) -> Result<Panel, BuildError> {
        if self.targets.is_empty() {
            return Err(BuildError::MissingField {
                builder: "panel",
                field: "targets",
            });
        }
        if self.grid_pos.w == 0 || self.grid_pos.w > GRID_WIDTH {
            return Err(BuildError::PanelTooWide {
                panel: self.title,
                width: self.grid_pos.w,
            });
        }

        let targets = build_targets(&self.title, self.targets)?;

        for transformation in &self.transformations {
            for ref_id in referenced_ref_ids(transformation) {
                if !targets.iter().any(|t| t.ref_id == ref_id) {
                    return Err(BuildError::UnknownRefId {
                        panel: self.title,
                        transformation: transformation.id.clone(),
                        ref_id,
                    });
                }
            }
        }

        let field_config = FieldConfig {
            defaults: FieldDefaults {
                unit: self.unit,
                min: self.min,
            },
            overrides: self.overrides,
        };

        Ok(Panel {
            panel_type: self.panel_type,
            id: 0,
            title: self.title,
            grid_pos: self.grid_pos,
            datasource: self.datasource,
            targets,
            field_config: Some(field_config),
            options: Some(Value::Object(self.options)),
            transformations: self.transformations,
            collapsed: None,
            panels: None,
        })
    }
}

pub struct RowBuilder {
    title: String,
}

impl RowBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Builder<Panel> for RowBuilder {
    fn build(self) -> Result<Panel, BuildError> {
        if self.title.is_empty() {
            return Err(BuildError::MissingField {
                builder: "row",
                field: "title",
            });
        }

        Ok(Panel {
            panel_type: PanelType::Row,
            id: 0,
            title: self.title,
            grid_pos: GridPos::sized(GRID_WIDTH, 1),
            datasource: None,
            targets: Vec::new(),
            field_config: None,
            options: None,
            transformations: Vec::new(),
            collapsed: Some(false),
            panels: Some(Vec::new()),
        })
    }
}

// === Variables ===

pub struct QueryVariableBuilder {
    variable: Variable,
    query_set: bool,
}

impl QueryVariableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            variable: Variable {
                variable_type: VariableType::Query,
                name: name.into(),
                label: None,
                query: String::new(),
                datasource: None,
                multi: None,
                include_all: None,
                all_value: None,
                regex: None,
                refresh: None,
            },
            query_set: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.variable.label = Some(label.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.variable.query = query.into();
        self.query_set = true;
        self
    }

    pub fn datasource(mut self, datasource: DataSourceRef) -> Self {
        self.variable.datasource = Some(datasource);
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.variable.multi = Some(multi);
        self
    }

    pub fn include_all(mut self, include_all: bool) -> Self {
        self.variable.include_all = Some(include_all);
        self
    }

    pub fn all_value(mut self, all_value: impl Into<String>) -> Self {
        self.variable.all_value = Some(all_value.into());
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.variable.regex = Some(regex.into());
        self
    }

    pub fn refresh(mut self, refresh: u8) -> Self {
        self.variable.refresh = Some(refresh);
        self
    }
}

impl Builder<Variable> for QueryVariableBuilder {
    fn build(self) -> Result<Variable, BuildError> {
        if self.variable.name.is_empty() {
            return Err(BuildError::MissingField {
                builder: "query variable",
                field: "name",
            });
        }
        if !self.query_set {
            return Err(BuildError::MissingField {
                builder: "query variable",
                field: "query",
            });
        }
        Ok(self.variable)
    }
}

pub struct DatasourceVariableBuilder {
    name: String,
    plugin: Option<String>,
}

impl DatasourceVariableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: None,
        }
    }

    /// Datasource plugin the selector offers, e.g. `prometheus`
    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }
}

impl Builder<Variable> for DatasourceVariableBuilder {
    fn build(self) -> Result<Variable, BuildError> {
        let plugin = self.plugin.ok_or(BuildError::MissingField {
            builder: "datasource variable",
            field: "plugin",
        })?;

        Ok(Variable {
            variable_type: VariableType::Datasource,
            name: self.name,
            label: None,
            query: plugin,
            datasource: None,
            multi: None,
            include_all: None,
            all_value: None,
            regex: None,
            refresh: None,
        })
    }
}

// === Dashboard ===

/// Cursor used to flow panels left to right, top to bottom
#[derive(Debug, Default)]
struct GridLayout {
    x: u32,
    y: u32,
    last_height: u32,
}

impl GridLayout {
    fn place_row(&mut self) -> GridPos {
        let y = self.y + self.last_height;
        self.x = 0;
        self.y = y + 1;
        self.last_height = 0;

        GridPos {
            h: 1,
            w: GRID_WIDTH,
            x: 0,
            y,
        }
    }

    /// Panels positioned anywhere but the origin keep their position
    fn place_panel(&mut self, pos: &mut GridPos) {
        if pos.x != 0 || pos.y != 0 {
            return;
        }

        if self.x + pos.w > GRID_WIDTH {
            self.x = 0;
            self.y += self.last_height;
            self.last_height = 0;
        }

        pos.x = self.x;
        pos.y = self.y;
        self.x += pos.w;
        self.last_height = self.last_height.max(pos.h);
    }
}

pub struct DashboardBuilder {
    title: String,
    uid: Option<String>,
    tags: Vec<String>,
    refresh: Option<String>,
    time: TimeRange,
    timezone: String,
    variables: Vec<Variable>,
    panels: Vec<Panel>,
    layout: GridLayout,
    error: Option<BuildError>,
}

impl DashboardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uid: None,
            tags: Vec::new(),
            refresh: None,
            time: TimeRange {
                from: "now-6h".to_string(),
                to: "now".to_string(),
            },
            timezone: "browser".to_string(),
            variables: Vec::new(),
            panels: Vec::new(),
            layout: GridLayout::default(),
            error: None,
        }
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn time(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time = TimeRange {
            from: from.into(),
            to: to.into(),
        };
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn variable<B: Builder<Variable>>(mut self, variable: B) -> Self {
        match variable.build() {
            Ok(variable) => self.variables.push(variable),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn with_row(mut self, row: RowBuilder) -> Self {
        match row.build() {
            Ok(mut row) => {
                row.grid_pos = self.layout.place_row();
                self.push_panel(row);
            }
            Err(e) => self.record(e),
        }
        self
    }

    pub fn with_panel<B: Builder<Panel>>(mut self, panel: B) -> Self {
        match panel.build() {
            Ok(mut panel) => {
                self.layout.place_panel(&mut panel.grid_pos);
                self.push_panel(panel);
            }
            Err(e) => self.record(e),
        }
        self
    }

    fn push_panel(&mut self, mut panel: Panel) {
        panel.id = self.panels.len() as u32 + 1;
        trace!(
            "placed {:?} panel {} `{}` at {:?}",
            panel.panel_type,
            panel.id,
            panel.title,
            panel.grid_pos
        );
        self.panels.push(panel);
    }

    fn record(&mut self, error: BuildError) {
        debug!("dashboard builder error: {error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl Builder<Dashboard> for DashboardBuilder {
    fn build(self) -> Result<Dashboard, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.title.is_empty() {
            return Err(BuildError::MissingField {
                builder: "dashboard",
                field: "title",
            });
        }
        let uid = self.uid.ok_or(BuildError::MissingField {
            builder: "dashboard",
            field: "uid",
        })?;
        let refresh = self.refresh.ok_or(BuildError::MissingField {
            builder: "dashboard",
            field: "refresh",
        })?;
        humantime::parse_duration(&refresh).map_err(|source| BuildError::InvalidRefresh {
            value: refresh.clone(),
            source,
        })?;

        let mut names = BTreeSet::new();
        for variable in &self.variables {
            if !names.insert(variable.name.as_str()) {
                return Err(BuildError::DuplicateVariable(variable.name.clone()));
            }
        }

        Ok(Dashboard {
            title: self.title,
            uid,
            tags: self.tags,
            timezone: self.timezone,
            editable: true,
            graph_tooltip: 0,
            time: self.time,
            refresh,
            schema_version: 39,
            templating: Templating {
                list: self.variables,
            },
            panels: self.panels,
        })
    }
}
