//! Reconciler for PostgreSQL extensions
//!
//! The remote API can install extensions but not uninstall them. Deleting an
//! extension resource only drops it from state and leaves the extension in
//! place.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::client::{Cluster, ConfigExtensionRequest, ConfigureRequest};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::mutator::submit_and_wait;
use crate::controller::reconciler::{ManagedResource, fetch_cluster, first_non_empty};
use crate::model::{ExtensionId, ExtensionSpec, ExtensionState};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionReconciler;

/// Database the cluster reports for `extension`, preferring `wanted` when given
fn installed_database(cluster: &Cluster, extension: &str, wanted: Option<&str>) -> Option<String> {
    cluster
        .extensions
        .iter()
        .filter(|e| e.extension == extension)
        .find(|e| wanted.is_none_or(|db| e.database == db))
        .map(|e| e.database.clone())
}

#[async_trait]
impl ManagedResource for ExtensionReconciler {
    type Desired = ExtensionSpec;
    type State = ExtensionState;

    fn kind(&self) -> &'static str {
        "extension"
    }

    fn id(&self, state: &ExtensionState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &ExtensionSpec, state: &ExtensionState) -> bool {
        desired.cluster_id != state.cluster_id()
            || desired.extension != state.id.extension
            || desired
                .database
                .as_deref()
                .is_some_and(|db| db != state.database())
    }

    fn is_converged(&self, desired: &ExtensionSpec, state: &ExtensionState) -> bool {
        !self.requires_replacement(desired, state)
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id, extension = %desired.extension))]
    async fn create(&self, ctx: &Context, desired: &ExtensionSpec) -> Result<ExtensionState> {
        let cluster_id = desired.cluster_id;
        let req = ConfigureRequest {
            extensions: vec![ConfigExtensionRequest {
                extension: desired.extension.clone(),
                database: desired.database.clone().unwrap_or_default(),
            }],
            ..Default::default()
        };

        let resp = submit_and_wait(ctx, cluster_id.get(), &req)
            .await
            .context(|| {
                format!(
                    "installing extension {} on cluster {}",
                    desired.extension, cluster_id
                )
            })?;

        // Resolve the target database: response, cluster, desired value, cluster default
        let mut database = resp
            .extensions
            .iter()
            .find(|e| e.extension == desired.extension)
            .map(|e| e.database.clone())
            .filter(|db| !db.is_empty());

        let mut default_db = None;
        if database.is_none() {
            match ctx.client.get_cluster(cluster_id.get()).await {
                Ok(cluster) => {
                    database = installed_database(
                        &cluster,
                        &desired.extension,
                        desired.database.as_deref(),
                    );
                    default_db = Some(cluster.db_name);
                }
                Err(e) => warn!(error = %e, "Could not re-read cluster after create"),
            }
        }

        let database = first_non_empty([database, desired.database.clone(), default_db]);
        info!(database = %database, "Extension installed");

        Ok(ExtensionState {
            id: ExtensionId::new(cluster_id, desired.extension.clone(), database),
        })
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn read(&self, ctx: &Context, state: &ExtensionState) -> Result<Option<ExtensionState>> {
        let Some(cluster) = fetch_cluster(ctx, state.cluster_id())
            .await
            .context(|| format!("reading extension {}", state.id))?
        else {
            return Ok(None);
        };

        if cluster
            .find_extension(&state.id.extension, state.database())
            .is_none()
        {
            warn!("Extension no longer installed");
            return Ok(None);
        }
        Ok(Some(state.clone()))
    }

    async fn update(
        &self,
        _ctx: &Context,
        _desired: &ExtensionSpec,
        state: &ExtensionState,
    ) -> Result<ExtensionState> {
        Err(Error::UpdateUnsupported(format!("extension {}", state.id)))
    }

    #[instrument(skip(self, _ctx, state), fields(id = %state.id))]
    async fn delete(&self, _ctx: &Context, state: &ExtensionState) -> Result<()> {
        warn!(
            extension = %state.id.extension,
            database = %state.database(),
            "Removing extension from state only; the API cannot uninstall extensions, so it stays installed on the cluster"
        );
        Ok(())
    }

    fn import_state(&self, id: &str) -> Result<ExtensionState> {
        Ok(ExtensionState { id: id.parse()? })
    }
}
