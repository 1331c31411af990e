//! Cluster desired state and state records

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{Cluster, ClusterStatus, ProvisionClusterRequest};
use crate::model::identifier::ClusterId;

/// Minimum number of nodes in a cluster
pub const MIN_NODES: u32 = 1;

/// Desired state of an HA cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterSpec {
    pub name: String,

    /// Region slug, e.g. `eu-central`
    pub region: String,

    #[serde(default = "default_server_type")]
    pub server_type: String,

    /// Number of PostgreSQL nodes (the only field that changes in place)
    #[serde(default = "default_node_count")]
    pub node_count: u32,

    /// Name of the default database
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// `ha` or `core_solo`
    #[serde(default = "default_db_type")]
    pub db_type: String,

    #[serde(default = "default_postgresql_version")]
    pub postgresql_version: u32,

    /// Extensions installed at provisioning time only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<i64>,
}

fn default_server_type() -> String {
    "starter".to_string()
}

fn default_node_count() -> u32 {
    2
}

fn default_db_name() -> String {
    "appdb".to_string()
}

fn default_db_type() -> String {
    "ha".to_string()
}

fn default_postgresql_version() -> u32 {
    17
}

impl ClusterSpec {
    pub fn provision_request(&self) -> ProvisionClusterRequest {
        ProvisionClusterRequest {
            name: self.name.clone(),
            region: self.region.clone(),
            db_name: self.db_name.clone(),
            db_type: self.db_type.clone(),
            server_type: self.server_type.clone(),
            node_count: self.node_count,
            postgresql_version: self.postgresql_version,
            extensions: self.extensions.clone(),
            subscription_id: self.subscription_id,
        }
    }
}

/// Observed state of a cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterState {
    pub id: ClusterId,
    pub name: String,
    pub region: String,
    pub server_type: String,
    pub node_count: u32,
    pub db_name: String,
    pub db_type: String,
    pub postgresql_version: u32,

    /// Carried over from the desired state; never returned by reads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Carried over from the desired state; never returned by reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<i64>,

    pub tenant_id: String,
    pub status: ClusterStatus,
    pub health_status: String,
    pub host: String,
    pub connection_string: String,
    pub db_user: String,
    pub db_password: String,
    #[serde(default)]
    pub source_ips: BTreeSet<String>,
    /// Only set while the cluster is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClusterState {
    /// Map the remote aggregate, keeping the create-only inputs supplied by the caller
    pub fn from_remote(
        cluster: &Cluster,
        extensions: Vec<String>,
        subscription_id: Option<i64>,
    ) -> Self {
        let error_message = (cluster.status == ClusterStatus::Failed
            && !cluster.error_message.is_empty())
        .then(|| cluster.error_message.clone());

        Self {
            id: ClusterId(cluster.id),
            name: cluster.name.clone(),
            region: cluster.region.clone(),
            server_type: cluster.server_type.clone(),
            node_count: cluster.node_count,
            db_name: cluster.db_name.clone(),
            db_type: cluster.db_type.clone(),
            postgresql_version: cluster.postgresql_version,
            extensions,
            subscription_id,
            tenant_id: cluster.tenant_id.clone(),
            status: cluster.status.clone(),
            health_status: cluster.health_status.clone(),
            host: cluster.host.clone(),
            connection_string: cluster.connection_string.clone(),
            db_user: cluster.db_user.clone(),
            db_password: cluster.db_password.clone(),
            source_ips: parse_source_ips(&cluster.source_ips),
            error_message,
            created_at: cluster.created_at,
            updated_at: cluster.updated_at,
        }
    }

    /// Placeholder state for an imported cluster, filled in by the next read
    pub fn seed(id: ClusterId) -> Self {
        Self::from_remote(
            &Cluster {
                id: id.get(),
                ..Default::default()
            },
            Vec::new(),
            None,
        )
    }
}

/// Split the comma-joined wire allowlist into a set
pub fn parse_source_ips(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}

/// Name of the `index`-th node of a cluster (1-based)
pub fn node_name(tenant_id: &str, index: u32) -> String {
    format!("{}-db-{}", tenant_id, index)
}
