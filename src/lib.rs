//! Generates Grafana dashboard manifests for services instrumented with
//! OpenTelemetry.

pub mod dashboard;
pub mod error;
pub mod generate;
pub mod manifest;

pub use error::{BuildError, Error};
