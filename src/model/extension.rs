//! PostgreSQL extensions installed into a database

use serde::{Deserialize, Serialize};

use crate::model::identifier::{ClusterId, ExtensionId};

/// Desired extension. The remote API cannot uninstall, so every field forces replacement.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExtensionSpec {
    pub cluster_id: ClusterId,
    pub extension: String,
    /// Target database; the cluster's default database when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExtensionState {
    pub id: ExtensionId,
}

impl ExtensionState {
    pub fn cluster_id(&self) -> ClusterId {
        self.id.cluster_id
    }

    pub fn database(&self) -> &str {
        &self.id.database
    }
}
