pub mod builder;
pub mod common;
pub mod otel_app_semantic;
pub mod presets;
pub mod queries;

use self::common::Dashboard;
use crate::error::BuildError;

/// Names accepted by [`get_dashboard`]
pub const DASHBOARDS: &[&str] = &["otel-app-semantic"];

/// Get dashboard definition by name
pub fn get_dashboard(
    name: &str,
    config: &otel_app_semantic::Config,
) -> Option<Result<Dashboard, BuildError>> {
    match name {
        "otel-app-semantic" => Some(otel_app_semantic::build(config)),
        _ => None,
    }
}
