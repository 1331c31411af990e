//! Wire models for the Rivestack HA API

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a cluster as reported by the API.
///
/// Unrecognised values are kept verbatim in `Other` so pollers can fail
/// loudly instead of waiting on a state they do not understand.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ClusterStatus {
    #[default]
    Provisioning,
    Active,
    Failed,
    Deleted,
    Other(String),
}

impl From<String> for ClusterStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "provisioning" => ClusterStatus::Provisioning,
            "active" => ClusterStatus::Active,
            "failed" => ClusterStatus::Failed,
            "deleted" => ClusterStatus::Deleted,
            _ => ClusterStatus::Other(value),
        }
    }
}

impl From<ClusterStatus> for String {
    fn from(value: ClusterStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterStatus::Provisioning => write!(f, "provisioning"),
            ClusterStatus::Active => write!(f, "active"),
            ClusterStatus::Failed => write!(f, "failed"),
            ClusterStatus::Deleted => write!(f, "deleted"),
            ClusterStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Status of an asynchronous cluster job
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Failed,
    Succeeded,
    Other(String),
}

impl JobStatus {
    /// Whether the job still occupies the cluster's job slot
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "failed" => JobStatus::Failed,
            "succeeded" => JobStatus::Succeeded,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Request body for provisioning a new HA cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProvisionClusterRequest {
    pub name: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_type: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub node_count: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub postgresql_version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<i64>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Decodes an explicit `null` as the type's default.
///
/// The API encodes empty collections as `null` rather than `[]`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProvisionClusterResponse {
    pub id: i64,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full cluster aggregate with every sub-collection inlined
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Cluster {
    pub id: i64,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub server_type: String,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default)]
    pub postgresql_version: u32,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub db_user: String,
    #[serde(default)]
    pub db_password: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub connection_string: String,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub health_status: String,
    /// Comma-joined allowlist, e.g. `"10.0.0.0/8,192.168.1.10"`
    #[serde(default)]
    pub source_ips: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<ClusterUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: Vec<ClusterDatabase>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: Vec<ClusterExtension>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub grants: Vec<ClusterGrant>,
    #[serde(default)]
    pub backup_config: Option<BackupConfig>,
}

impl Cluster {
    pub fn find_user(&self, username: &str) -> Option<&ClusterUser> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn find_database(&self, name: &str) -> Option<&ClusterDatabase> {
        self.databases.iter().find(|d| d.db_name == name)
    }

    pub fn find_extension(&self, extension: &str, database: &str) -> Option<&ClusterExtension> {
        self.extensions
            .iter()
            .find(|e| e.extension == extension && e.database == database)
    }

    pub fn find_grant(&self, username: &str, database: &str) -> Option<&ClusterGrant> {
        self.grants
            .iter()
            .find(|g| g.username == username && g.database == database)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterDatabase {
    pub db_name: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterExtension {
    pub extension: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterGrant {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    pub database: String,
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ClusterListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<Cluster>,
}

/// Unified configure envelope.
///
/// Supports batched mutations across every entity kind; each array is
/// omitted from the wire when empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigureRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<ConfigUserRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<ConfigDatabaseRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_databases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ConfigExtensionRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<ConfigGrantRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_ips: Vec<String>,
    /// Replace the allowlist with `source_ips` instead of merging into it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace_ips: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigUserRequest {
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigDatabaseRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigExtensionRequest {
    pub extension: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigGrantRequest {
    pub username: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access: String,
}

/// Response from the configure endpoint.
///
/// `job_id == 0` means the change was applied synchronously.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigureResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub job_id: i64,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<ConfigUserResponse>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted_users: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: Vec<ConfigDatabaseResponse>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted_databases: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: Vec<ConfigExtensionResponse>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub grants: Vec<ConfigGrantRequest>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_ips: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted_ips: Vec<String>,
}

impl ConfigureResponse {
    /// Whether the mutation spawned an asynchronous job
    pub fn spawned_job(&self) -> bool {
        self.job_id > 0
    }
}

/// A user in the configure response, carrying the generated password
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigUserResponse {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigDatabaseResponse {
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigExtensionResponse {
    pub extension: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AddNodeResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub job_id: i64,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub new_node_count: u32,
    #[serde(default)]
    pub new_node_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemoveNodeRequest {
    pub node_name: String,
    pub delete_server: bool,
    pub remove_postgres_data: bool,
}

impl RemoveNodeRequest {
    /// Fully decommission the node: server and data are both removed
    pub fn decommission(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            delete_server: true,
            remove_postgres_data: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RemoveNodeResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub job_id: i64,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub new_node_count: u32,
    #[serde(default)]
    pub removed_node: String,
}

/// Backup configuration of a cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BackupConfig {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub cluster_id: i64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: String,
    /// Number of full backups kept
    #[serde(default)]
    pub retention_full: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UpdateBackupConfigRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_full: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServerType {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cpus: u32,
    #[serde(default)]
    pub memory_gb: u32,
    #[serde(default)]
    pub storage_gb: u32,
    #[serde(default)]
    pub storage_avail_gb: u32,
    #[serde(default)]
    pub price_per_node: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServerTypesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub server_types: Vec<ServerType>,
    #[serde(default)]
    pub default: String,
}

/// A PostgreSQL extension available on the platform
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Extension {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ExtensionsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub total_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JobsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub count: u32,
}

/// An asynchronous unit of work on a cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Job {
    pub id: i64,
    #[serde(default)]
    pub job_type: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
