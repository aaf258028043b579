use crate::dashboard::common::Dashboard;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "dashboard.grafana.app/v1beta1";
pub const KIND: &str = "Dashboard";
pub const FOLDER_ANNOTATION: &str = "grafana.app/folder";

/// Resource envelope Grafana's provisioning tooling expects around a dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: Dashboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub annotations: BTreeMap<String, String>,
    pub name: String,
}

impl Manifest {
    /// Wraps a dashboard for the folder with the given uid. An empty uid
    /// places it in the general folder.
    pub fn new(folder_uid: &str, dashboard: Dashboard) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(FOLDER_ANNOTATION.to_string(), folder_uid.to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: Metadata {
                annotations,
                name: dashboard.uid.clone(),
            },
            spec: dashboard,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, Error> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
