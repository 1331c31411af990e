//! Gateway to the Rivestack HA API.
//!
//! The reconcilers depend only on the [`ApiClient`] trait. [`HttpApiClient`]
//! is the production implementation; tests substitute an in-memory fake.

pub mod error;
pub mod http;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use http::HttpApiClient;
pub use models::*;

use async_trait::async_trait;

/// Fixed method contract of the remote API.
///
/// Every call is a stateless request/response cycle so one client can be
/// shared by concurrently reconciled resources.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn provision_cluster(
        &self,
        req: &ProvisionClusterRequest,
    ) -> ApiResult<ProvisionClusterResponse>;

    /// Full cluster aggregate, sub-collections inlined
    async fn get_cluster(&self, cluster_id: i64) -> ApiResult<Cluster>;

    async fn list_clusters(&self) -> ApiResult<Vec<Cluster>>;

    /// Start deleting a cluster. Completion is observed by polling `get_cluster`.
    async fn delete_cluster(&self, cluster_id: i64) -> ApiResult<()>;

    async fn add_node(&self, cluster_id: i64) -> ApiResult<AddNodeResponse>;

    async fn remove_node(
        &self,
        cluster_id: i64,
        req: &RemoveNodeRequest,
    ) -> ApiResult<RemoveNodeResponse>;

    /// Submit a unified configure envelope
    async fn configure(
        &self,
        cluster_id: i64,
        req: &ConfigureRequest,
    ) -> ApiResult<ConfigureResponse>;

    /// Jobs currently queued or running on the cluster
    async fn list_active_jobs(&self, cluster_id: i64) -> ApiResult<Vec<Job>>;

    async fn get_backup_config(&self, cluster_id: i64) -> ApiResult<BackupConfig>;

    async fn update_backup_config(
        &self,
        cluster_id: i64,
        req: &UpdateBackupConfigRequest,
    ) -> ApiResult<BackupConfig>;

    async fn list_server_types(&self) -> ApiResult<ServerTypesResponse>;

    async fn list_extensions(&self) -> ApiResult<ExtensionsResponse>;
}
