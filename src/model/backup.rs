//! Backup configuration of a cluster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{BackupConfig, UpdateBackupConfigRequest};
use crate::model::identifier::ClusterId;

/// Desired backup settings. Unset fields keep the remote value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BackupConfigSpec {
    pub cluster_id: ClusterId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Cron expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Days of full backups to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_full: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

impl BackupConfigSpec {
    pub fn update_request(&self) -> UpdateBackupConfigRequest {
        UpdateBackupConfigRequest {
            enabled: Some(self.enabled),
            schedule: self.schedule.clone(),
            retention_full: self.retention_full,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BackupConfigState {
    pub id: ClusterId,
    pub enabled: bool,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub retention_full: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BackupConfigState {
    pub fn from_remote(id: ClusterId, config: &BackupConfig) -> Self {
        Self {
            id,
            enabled: config.enabled,
            schedule: config.schedule.clone(),
            retention_full: config.retention_full,
            updated_at: config.updated_at,
        }
    }
}
