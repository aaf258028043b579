use super::builder::*;
use super::common::*;

pub fn prometheus_ds_selector() -> DatasourceVariableBuilder {
    DatasourceVariableBuilder::new(PROMETHEUS_DS_UID).plugin(PROMETHEUS_DS_TYPE)
}

pub fn loki_ds_selector() -> DatasourceVariableBuilder {
    DatasourceVariableBuilder::new(LOKI_DS_UID).plugin(LOKI_DS_TYPE)
}

pub fn timeseries_panel() -> PanelBuilder {
    PanelBuilder::timeseries()
        .datasource(DataSourceRef::prometheus())
        .height(7)
}

pub fn table_panel() -> PanelBuilder {
    PanelBuilder::table().datasource(DataSourceRef::prometheus())
}

pub fn logs_panel() -> PanelBuilder {
    PanelBuilder::logs().datasource(DataSourceRef::loki())
}

/// Fixed colors for the `1xx`..`5xx` status buckets
pub fn http_red_reqs_overrides() -> Vec<FieldOverride> {
    [
        ("1xx", "#EAB839"),
        ("2xx", "#7EB26D"),
        ("3xx", "#6ED0E0"),
        ("4xx", "#EF843C"),
        ("5xx", "#E24D42"),
    ]
    .into_iter()
    .map(|(status, color)| {
        FieldOverride::by_name(status, vec![Property::color(FieldColor::fixed(color))])
    })
    .collect()
}
