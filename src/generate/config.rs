use crate::dashboard::otel_app_semantic;
use crate::error::Error;
use serde::Deserialize;
use std::path::Path;

/// Contents of a `--config` TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct File {
    /// Folder uid written to the manifest annotation
    pub folder: String,
    pub dashboard: otel_app_semantic::Config,
}

impl File {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| Error::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}
