//! HTTP RED dashboard for services instrumented with the OpenTelemetry
//! semantic conventions.
//!
//! Layout:
//! * HTTP RED Overview: request rate by status class and latency
//! * HTTP Route Details: per route table of rate, error ratio and p95
//! * Logs: only when a log query is configured

use super::builder::*;
use super::common::*;
use super::presets::*;
use super::queries::*;
use crate::error::BuildError;
use ringlog::{debug, info};
use serde::Deserialize;
use serde_json::json;

pub const TITLE: &str = "OTel Application Semantic convention";
pub const UID: &str = "otel-app-semantic-conventions";

/// Log query used by the CLI when no configuration says otherwise
pub const DEFAULT_LOGS_QUERY: &str =
    r#"{service_namespace=~"$service_namespace", service_name=~"$service_name"}"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// LogQL expression for the logs row. Unset or empty drops the row.
    pub logs_query: Option<String>,
    /// Restricts the `service_namespace` variable to these values
    pub service_namespaces: Vec<String>,
    /// Restricts the `service_name` variable to these values
    pub service_names: Vec<String>,
}

impl Config {
    pub fn logs_query(&self) -> Option<&str> {
        self.logs_query.as_deref().filter(|q| !q.is_empty())
    }
}

pub fn build(config: &Config) -> Result<Dashboard, BuildError> {
    info!(
        "building `{UID}` with {} namespace(s), {} service name(s), logs {}",
        config.service_namespaces.len(),
        config.service_names.len(),
        if config.logs_query().is_some() { "enabled" } else { "disabled" },
    );

    let mut builder = DashboardBuilder::new(TITLE)
        .uid(UID)
        .tags(["otel", "generated"])
        .refresh("1m")
        .time("now-60m", "now")
        .timezone("browser")
        .variable(prometheus_ds_selector())
        .variable(loki_ds_selector())
        .variable(service_namespace_var(&config.service_namespaces))
        .variable(service_name_var(&config.service_names))
        .with_row(RowBuilder::new("HTTP RED Overview"))
        .with_panel(rps_overview_panel())
        .with_panel(latency_overview_panel())
        .with_row(RowBuilder::new("HTTP Route Details"))
        .with_panel(rps_details_panel());

    if let Some(query) = config.logs_query() {
        builder = builder
            .with_row(RowBuilder::new("Logs"))
            .with_panel(logs_table_panel(query));
    }

    builder.build()
}

fn rps_overview_panel() -> PanelBuilder {
    timeseries_panel()
        .title("Requests/sec")
        .unit("reqps")
        .min(0.0)
        .with_target(
            QueryBuilder::prometheus()
                .expr(http_requests())
                .legend_format("{{ status }}"),
        )
        .overrides(http_red_reqs_overrides())
}

fn latency_overview_panel() -> PanelBuilder {
    timeseries_panel()
        .title("Latency")
        .unit("s")
        .min(0.0)
        .targets([
            QueryBuilder::prometheus()
                .expr(p99_latency())
                .legend_format("99th percentile"),
            QueryBuilder::prometheus()
                .expr(p50_latency())
                .legend_format("50th percentile"),
            QueryBuilder::prometheus()
                .expr(avg_latency())
                .legend_format("Average"),
        ])
}

/// Column header the table gives a converted time series
fn trend(ref_id: &str) -> String {
    format!("Trend #{ref_id}")
}

fn rps_details_panel() -> PanelBuilder {
    table_panel()
        .targets([
            QueryBuilder::prometheus()
                .expr(reqs_rate_ops())
                .range()
                .ref_id(REQS_RATE_OPS_ID),
            QueryBuilder::prometheus()
                .expr(reqs_rate_ops_error())
                .range()
                .ref_id(REQS_RATE_OPS_ERROR_ID),
            QueryBuilder::prometheus()
                .expr(p95_latency_ops())
                .range()
                .ref_id(P95_LATENCY_OPS_ID),
        ])
        .grid_pos(GridPos::sized(GRID_WIDTH, 10))
        .sort_by(vec![SortBy {
            display_name: "duration p95".to_string(),
            desc: true,
        }])
        .transformations(vec![
            Transformation {
                id: "timeSeriesTable".to_string(),
                options: json!({
                    REQS_RATE_OPS_ID: {"timeField": "Time"},
                    REQS_RATE_OPS_ERROR_ID: {"timeField": "Time"},
                    P95_LATENCY_OPS_ID: {"timeField": "Time"},
                }),
            },
            Transformation {
                id: "joinByField".to_string(),
                options: json!({"byField": "operation", "mode": "outer"}),
            },
            Transformation {
                id: "organize".to_string(),
                options: json!({
                    "excludeByName": {
                        "http_request_method 1": true,
                        "http_request_method 2": true,
                        "http_request_method 3": true,
                        "http_route 1": true,
                        "http_route 2": true,
                        "http_route 3": true,
                    },
                    "renameByName": {
                        trend(REQS_RATE_OPS_ID): "rate",
                        trend(REQS_RATE_OPS_ERROR_ID): "errors",
                        trend(P95_LATENCY_OPS_ID): "duration p95",
                    },
                    "indexByName": {
                        "operation": 0,
                        trend(P95_LATENCY_OPS_ID): 1,
                        trend(REQS_RATE_OPS_ID): 2,
                        trend(REQS_RATE_OPS_ERROR_ID): 3,
                    },
                }),
            },
        ])
        .overrides(vec![
            FieldOverride::by_name(
                "duration p95",
                vec![
                    Property::unit("s"),
                    Property::color(FieldColor::shades("orange")),
                ],
            ),
            FieldOverride::by_name(
                "rate",
                vec![
                    Property::unit("reqps"),
                    Property::color(FieldColor::shades("green")),
                ],
            ),
            FieldOverride::by_name(
                "errors",
                vec![
                    Property::unit("percentunit"),
                    Property::color(FieldColor::shades("red")),
                ],
            ),
        ])
}

fn logs_table_panel(logs_query: &str) -> PanelBuilder {
    logs_panel()
        .with_target(QueryBuilder::loki().expr(logs_query).range())
        .enable_infinite_scrolling(true)
        .grid_pos(GridPos::sized(GRID_WIDTH, 10))
}

/// Grafana regex filter admitting exactly the given values, in order. Values
/// are passed through untouched so they may carry patterns of their own.
fn allow_list_regex(options: &[String]) -> String {
    format!("/^({})$/", options.join("|"))
}

/// Query variable over `target_info`. A non-empty allow-list narrows the
/// options with a regex, and a single entry pins the selection.
fn service_var(
    name: &str,
    label: &str,
    query: &str,
    all_value: &str,
    options: &[String],
) -> QueryVariableBuilder {
    let mut var = QueryVariableBuilder::new(name)
        .label(label)
        .query(query)
        .datasource(DataSourceRef::prometheus())
        .multi(true)
        .include_all(true)
        .all_value(all_value)
        .refresh(REFRESH_ON_DASHBOARD_LOAD);

    if !options.is_empty() {
        var = var.regex(allow_list_regex(options)).all_value("");
        if options.len() == 1 {
            var = var.multi(false).include_all(false);
        }
        debug!("`{name}` restricted to {options:?}");
    }

    var
}

fn service_namespace_var(options: &[String]) -> QueryVariableBuilder {
    service_var(
        "service_namespace",
        "Service Namespace",
        SERVICE_NAMESPACE_VAR_QUERY,
        ".*",
        options,
    )
}

fn service_name_var(options: &[String]) -> QueryVariableBuilder {
    service_var(
        "service_name",
        "Service Name",
        SERVICE_NAME_VAR_QUERY,
        ".+",
        options,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn panel_of(dashboard: &Dashboard, panel_type: PanelType) -> Option<&Panel> {
        dashboard.panels.iter().find(|p| p.panel_type == panel_type)
    }

    fn with_logs() -> Config {
        Config {
            logs_query: Some(r#"{service_name="x"}"#.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unrestricted_variables() {
        let dashboard = build(&Config::default()).unwrap();

        let ns = dashboard.variable("service_namespace").unwrap();
        assert_eq!(ns.query, SERVICE_NAMESPACE_VAR_QUERY);
        assert_eq!(ns.label.as_deref(), Some("Service Namespace"));
        assert_eq!(ns.multi, Some(true));
        assert_eq!(ns.include_all, Some(true));
        assert_eq!(ns.all_value.as_deref(), Some(".*"));
        assert_eq!(ns.regex, None);
        assert_eq!(ns.refresh, Some(1));

        let name = dashboard.variable("service_name").unwrap();
        assert_eq!(name.query, SERVICE_NAME_VAR_QUERY);
        assert_eq!(name.multi, Some(true));
        assert_eq!(name.include_all, Some(true));
        assert_eq!(name.all_value.as_deref(), Some(".+"));
        assert_eq!(name.regex, None);
    }

    #[test]
    fn single_namespace_is_pinned() {
        let config = Config {
            service_namespaces: strings(&["teamA"]),
            ..Default::default()
        };
        let dashboard = build(&config).unwrap();

        let ns = dashboard.variable("service_namespace").unwrap();
        assert_eq!(ns.regex.as_deref(), Some("/^(teamA)$/"));
        assert_eq!(ns.multi, Some(false));
        assert_eq!(ns.include_all, Some(false));
        assert_eq!(ns.all_value.as_deref(), Some(""));

        let name = dashboard.variable("service_name").unwrap();
        assert_eq!(name.regex, None);
        assert_eq!(name.multi, Some(true));
        assert_eq!(name.include_all, Some(true));
    }

    #[test]
    fn several_names_keep_order() {
        let config = Config {
            service_names: strings(&["checkout", "api", "billing"]),
            ..Default::default()
        };
        let dashboard = build(&config).unwrap();

        let name = dashboard.variable("service_name").unwrap();
        assert_eq!(name.regex.as_deref(), Some("/^(checkout|api|billing)$/"));
        assert_eq!(name.all_value.as_deref(), Some(""));
        assert_eq!(name.multi, Some(true));
        assert_eq!(name.include_all, Some(true));
    }

    #[test]
    fn allow_list_values_pass_through() {
        let config = Config {
            service_namespaces: strings(&["teamA", ""]),
            service_names: strings(&["(?!canary).*"]),
            ..Default::default()
        };
        let dashboard = build(&config).unwrap();

        let ns = dashboard.variable("service_namespace").unwrap();
        assert_eq!(ns.regex.as_deref(), Some("/^(teamA|)$/"));
        assert_eq!(ns.multi, Some(true));

        let name = dashboard.variable("service_name").unwrap();
        assert_eq!(name.regex.as_deref(), Some("/^((?!canary).*)$/"));
        assert_eq!(name.multi, Some(false));
        assert_eq!(name.include_all, Some(false));
    }

    #[test]
    fn variable_order() {
        let dashboard = build(&Config::default()).unwrap();
        let names: Vec<_> = dashboard
            .templating
            .list
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["prom", "loki", "service_namespace", "service_name"]);
    }

    #[test]
    fn metadata() {
        let dashboard = build(&Config::default()).unwrap();
        assert_eq!(dashboard.title, TITLE);
        assert_eq!(dashboard.uid, UID);
        assert_eq!(dashboard.tags, vec!["otel", "generated"]);
        assert_eq!(dashboard.refresh, "1m");
        assert_eq!(dashboard.time.from, "now-60m");
        assert_eq!(dashboard.time.to, "now");
        assert_eq!(dashboard.timezone, "browser");
    }

    #[test]
    fn logs_row_toggles() {
        let dashboard = build(&with_logs()).unwrap();
        let rows: Vec<_> = dashboard.rows().map(|r| r.title.as_str()).collect();
        assert_eq!(rows, vec!["HTTP RED Overview", "HTTP Route Details", "Logs"]);
        assert_eq!(dashboard.panels.len(), 7);

        let logs = panel_of(&dashboard, PanelType::Logs).unwrap();
        assert_eq!(logs.title, "");
        assert_eq!(logs.targets[0].expr, r#"{service_name="x"}"#);
        assert_eq!(logs.targets[0].range, Some(true));
        assert_eq!(logs.targets[0].datasource, DataSourceRef::loki());
        assert_eq!(
            logs.options.as_ref().unwrap()["enableInfiniteScrolling"],
            json!(true)
        );

        for config in [
            Config::default(),
            Config {
                logs_query: Some(String::new()),
                ..Default::default()
            },
        ] {
            let dashboard = build(&config).unwrap();
            let rows: Vec<_> = dashboard.rows().map(|r| r.title.as_str()).collect();
            assert_eq!(rows, vec!["HTTP RED Overview", "HTTP Route Details"]);
            assert_eq!(dashboard.panels.len(), 5);
            assert!(panel_of(&dashboard, PanelType::Logs).is_none());
        }
    }

    #[test]
    fn layout() {
        let dashboard = build(&with_logs()).unwrap();
        let layout: Vec<_> = dashboard
            .panels
            .iter()
            .map(|p| (p.id, p.grid_pos.x, p.grid_pos.y, p.grid_pos.w, p.grid_pos.h))
            .collect();
        assert_eq!(
            layout,
            vec![
                (1, 0, 0, 24, 1),
                (2, 0, 1, 12, 7),
                (3, 12, 1, 12, 7),
                (4, 0, 8, 24, 1),
                (5, 0, 9, 24, 10),
                (6, 0, 19, 24, 1),
                (7, 0, 20, 24, 10),
            ]
        );
    }

    #[test]
    fn overview_panels() {
        let dashboard = build(&Config::default()).unwrap();

        let rps = dashboard.panel("Requests/sec").unwrap();
        assert_eq!(rps.panel_type, PanelType::Timeseries);
        let defaults = &rps.field_config.as_ref().unwrap().defaults;
        assert_eq!(defaults.unit.as_deref(), Some("reqps"));
        assert_eq!(defaults.min, Some(0.0));
        assert_eq!(rps.targets.len(), 1);
        assert_eq!(rps.targets[0].legend_format.as_deref(), Some("{{ status }}"));
        assert_eq!(rps.field_config.as_ref().unwrap().overrides.len(), 5);

        let latency = dashboard.panel("Latency").unwrap();
        let legends: Vec<_> = latency
            .targets
            .iter()
            .map(|t| t.legend_format.as_deref().unwrap())
            .collect();
        assert_eq!(legends, vec!["99th percentile", "50th percentile", "Average"]);
        let ref_ids: Vec<_> = latency.targets.iter().map(|t| t.ref_id.as_str()).collect();
        assert_eq!(ref_ids, vec!["A", "B", "C"]);
        assert_eq!(latency.targets[2].expr, avg_latency());
    }

    #[test]
    fn route_table_ref_ids() {
        let dashboard = build(&Config::default()).unwrap();
        let table = panel_of(&dashboard, PanelType::Table).unwrap();
        assert_eq!(table.title, "");

        let ref_ids: Vec<_> = table.targets.iter().map(|t| t.ref_id.as_str()).collect();
        assert_eq!(ref_ids, vec!["reqsRateOps", "reqsRateOpsError", "p95LatencyOps"]);
        assert!(table.targets.iter().all(|t| t.range == Some(true)));

        let ids: Vec<_> = table.transformations.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["timeSeriesTable", "joinByField", "organize"]);

        let series = table.transformations[0].options.as_object().unwrap();
        let mut keys: Vec<_> = series.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["p95LatencyOps", "reqsRateOps", "reqsRateOpsError"]);

        assert_eq!(
            table.transformations[1].options,
            json!({"byField": "operation", "mode": "outer"})
        );

        let organize = &table.transformations[2].options;
        assert_eq!(
            organize["renameByName"],
            json!({
                "Trend #reqsRateOps": "rate",
                "Trend #reqsRateOpsError": "errors",
                "Trend #p95LatencyOps": "duration p95",
            })
        );
        assert_eq!(organize["indexByName"]["operation"], json!(0));
        assert_eq!(organize["indexByName"]["Trend #p95LatencyOps"], json!(1));
        assert_eq!(organize["excludeByName"].as_object().unwrap().len(), 6);

        // renamed columns are the ones the overrides and sort refer to
        let overridden: Vec<_> = table
            .field_config
            .as_ref()
            .unwrap()
            .overrides
            .iter()
            .map(|o| o.matcher.options.as_str())
            .collect();
        assert_eq!(overridden, vec!["duration p95", "rate", "errors"]);
        assert_eq!(
            table.options.as_ref().unwrap()["sortBy"],
            json!([{"displayName": "duration p95", "desc": true}])
        );
    }

    #[test]
    fn route_table_overrides() {
        let dashboard = build(&Config::default()).unwrap();
        let table = panel_of(&dashboard, PanelType::Table).unwrap();
        let overrides = &table.field_config.as_ref().unwrap().overrides;

        let errors = &overrides[2];
        assert_eq!(errors.properties[0].value, json!("percentunit"));
        assert_eq!(
            errors.properties[1].value,
            json!({"mode": "shades", "fixedColor": "red"})
        );
        assert_eq!(
            overrides[0].properties[1].value,
            json!({"mode": "shades", "fixedColor": "orange"})
        );
    }
}
