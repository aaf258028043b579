//! PromQL templates for HTTP server metrics following the OpenTelemetry
//! semantic conventions (`http.server.request.duration` histogram).
//!
//! Every expression is filtered by the `service_namespace` and
//! `service_name` dashboard variables.

pub const SERVICE_NAMESPACE_VAR_QUERY: &str = "label_values(target_info, service_namespace)";
pub const SERVICE_NAME_VAR_QUERY: &str =
    r#"label_values(target_info{service_namespace=~"$service_namespace"}, service_name)"#;

/// Label matchers for the service selected in the dashboard variables
pub const SELECTORS: &str =
    r#"service_namespace=~"$service_namespace", service_name=~"$service_name""#;

pub const REQS_RATE_OPS_ID: &str = "reqsRateOps";
pub const REQS_RATE_OPS_ERROR_ID: &str = "reqsRateOpsError";
pub const P95_LATENCY_OPS_ID: &str = "p95LatencyOps";

/// Request rate bucketed by the leading digit of the status code (`2xx`, ...)
pub fn http_requests() -> String {
    format!(
        r#"
sum by (status) (
  label_replace(
    rate(
      http_server_request_duration_seconds_count{{{SELECTORS}}}[$__rate_interval]
    ),
    "status",
    "${{1}}xx",
    "http_response_status_code",
    "([0-9]).."
  )
)"#
    )
}

fn latency_quantile(quantile: &str) -> String {
    format!(
        r#"
histogram_quantile(
  {quantile},
  sum by (le) (
    rate(
      http_server_request_duration_seconds_bucket{{{SELECTORS}}}[$__rate_interval]
    )
  )
)"#
    )
}

pub fn p99_latency() -> String {
    latency_quantile("0.99")
}

pub fn p50_latency() -> String {
    latency_quantile("0.50")
}

/// Mean latency from the histogram sum and count, not from the quantiles
pub fn avg_latency() -> String {
    format!(
        r#"
  sum(
    rate(
      http_server_request_duration_seconds_sum{{{SELECTORS}}}[$__rate_interval]
    )
  )
/
  sum(
    rate(
      http_server_request_duration_seconds_count{{{SELECTORS}}}[$__rate_interval]
    )
  )
"#
    )
}

/// Per route request rate with an `operation` label of `<method> <route>`
pub fn reqs_rate_ops() -> String {
    format!(
        r#"
label_join(
  sum by (http_request_method, http_route) (
    rate(
      http_server_request_duration_seconds_count{{{SELECTORS}}}[$__rate_interval]
    )
  ),
  "operation",
  " ",
  "http_request_method",
  "http_route"
)"#
    )
}

/// Per route 5xx ratio. Routes without errors are zero filled from the
/// request rate so they still show up in the join.
pub fn reqs_rate_ops_error() -> String {
    let rate = reqs_rate_ops();
    format!(
        r#"
(label_join(
  sum by (http_request_method, http_route) (
    rate(
      http_server_request_duration_seconds_count{{http_response_status_code=~"5..", {SELECTORS}}}[$__rate_interval]
    )
  ),
  "operation",
  " ",
  "http_request_method",
  "http_route"
) or 0 * {rate}) / {rate}"#
    )
}

pub fn p95_latency_ops() -> String {
    format!(
        r#"
label_join(
  histogram_quantile(
    0.95,
    sum by (le, http_request_method, http_route) (rate(http_server_request_duration_seconds_bucket{{{SELECTORS}}}[5m]))
  ),
  "operation",
  " ",
  "http_request_method",
  "http_route"
)"#
    )
}
