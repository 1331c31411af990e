//! `reqwest` implementation of the API gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::models::*;
use crate::client::{ApiClient, ApiError, ApiResult};
use crate::config::ProviderConfig;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated JSON client for the Rivestack API
#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    cancel: CancellationToken,
}

impl HttpApiClient {
    pub fn new(config: &ProviderConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            cancel: CancellationToken::new(),
        })
    }

    /// Abort in-flight requests once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Sending API request");

        let mut request = self.http.request(method, &url).bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, ApiError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(url = %url, "API request cancelled");
                return Err(ApiError::Cancelled);
            }
            result = exchange => result?,
        };

        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::from_response(status.as_u16(), &bytes));
        }

        if bytes.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send::<(), T>(Method::GET, path, None).await
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn provision_cluster(
        &self,
        req: &ProvisionClusterRequest,
    ) -> ApiResult<ProvisionClusterResponse> {
        self.send(Method::POST, "/api/ha/provision", Some(req)).await
    }

    async fn get_cluster(&self, cluster_id: i64) -> ApiResult<Cluster> {
        self.get(&format!("/api/ha/{}", cluster_id)).await
    }

    async fn list_clusters(&self) -> ApiResult<Vec<Cluster>> {
        let resp: ClusterListResponse = self.get("/api/ha").await?;
        Ok(resp.clusters)
    }

    async fn delete_cluster(&self, cluster_id: i64) -> ApiResult<()> {
        // The delete response body is informational only
        let _: serde_json::Value = self
            .send::<(), _>(Method::DELETE, &format!("/api/ha/{}", cluster_id), None)
            .await?;
        Ok(())
    }

    async fn add_node(&self, cluster_id: i64) -> ApiResult<AddNodeResponse> {
        self.send::<(), _>(
            Method::POST,
            &format!("/api/ha/{}/add-node", cluster_id),
            None,
        )
        .await
    }

    async fn remove_node(
        &self,
        cluster_id: i64,
        req: &RemoveNodeRequest,
    ) -> ApiResult<RemoveNodeResponse> {
        self.send(
            Method::POST,
            &format!("/api/ha/{}/remove-node", cluster_id),
            Some(req),
        )
        .await
    }

    async fn configure(
        &self,
        cluster_id: i64,
        req: &ConfigureRequest,
    ) -> ApiResult<ConfigureResponse> {
        self.send(
            Method::POST,
            &format!("/api/ha/{}/configure", cluster_id),
            Some(req),
        )
        .await
    }

    async fn list_active_jobs(&self, cluster_id: i64) -> ApiResult<Vec<Job>> {
        let resp: JobsResponse = self
            .get(&format!("/api/ha/{}/jobs?active=true", cluster_id))
            .await?;
        Ok(resp.jobs)
    }

    async fn get_backup_config(&self, cluster_id: i64) -> ApiResult<BackupConfig> {
        self.get(&format!("/api/ha/{}/backup-config", cluster_id)).await
    }

    async fn update_backup_config(
        &self,
        cluster_id: i64,
        req: &UpdateBackupConfigRequest,
    ) -> ApiResult<BackupConfig> {
        self.send(
            Method::PUT,
            &format!("/api/ha/{}/backup-config", cluster_id),
            Some(req),
        )
        .await
    }

    async fn list_server_types(&self) -> ApiResult<ServerTypesResponse> {
        self.get("/api/ha/server-types").await
    }

    async fn list_extensions(&self) -> ApiResult<ExtensionsResponse> {
        self.get("/api/ha/extensions").await
    }
}
