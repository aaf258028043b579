use std::path::PathBuf;

use thiserror::Error;

/// Structural problems detected while assembling a dashboard
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{builder}: required field `{field}` is not set")]
    MissingField {
        builder: &'static str,
        field: &'static str,
    },

    #[error("variable `{0}` is defined more than once")]
    DuplicateVariable(String),

    #[error("panel `{panel}`: refId `{ref_id}` is used by more than one target")]
    DuplicateRefId { panel: String, ref_id: String },

    #[error("panel `{panel}`: transformation `{transformation}` references unknown refId `{ref_id}`")]
    UnknownRefId {
        panel: String,
        transformation: String,
        ref_id: String,
    },

    #[error("panel `{panel}`: width {width} does not fit in the grid")]
    PanelTooWide { panel: String, width: u32 },

    #[error("invalid refresh interval `{value}`: {source}")]
    InvalidRefresh {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to serialize dashboard manifest: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("unknown dashboard `{0}`")]
    UnknownDashboard(String),
}
