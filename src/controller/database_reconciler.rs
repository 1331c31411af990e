//! Database reconciler
//!
//! Databases are created through the configure envelope. The owner may be
//! changed in place: the remote side upserts the owner assignment when the
//! same database is submitted again.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::client::{ConfigDatabaseRequest, ConfigureRequest, ConfigureResponse};
use crate::controller::context::Context;
use crate::controller::error::{Result, ResultExt};
use crate::controller::mutator::submit_and_wait;
use crate::controller::reconciler::{
    ManagedResource, fetch_cluster, first_non_empty, lookup_in_cluster,
};
use crate::model::{DatabaseId, DatabaseSpec, DatabaseState};

#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseReconciler;

impl DatabaseReconciler {
    /// Submit the database (create or owner upsert) and resolve its owner
    async fn apply(&self, ctx: &Context, desired: &DatabaseSpec) -> Result<DatabaseState> {
        let id = DatabaseId::new(desired.cluster_id, desired.name.clone());
        let req = ConfigureRequest {
            databases: vec![ConfigDatabaseRequest {
                name: desired.name.clone(),
                owner: desired.owner.clone().unwrap_or_default(),
            }],
            ..Default::default()
        };

        let resp = submit_and_wait(ctx, id.cluster_id.get(), &req)
            .await
            .context(|| format!("applying database {}", id))?;

        let owner = self.resolve_owner(ctx, desired, &resp).await;
        Ok(DatabaseState { id, owner })
    }

    /// Owner from the response, then the cluster, then the desired value
    async fn resolve_owner(
        &self,
        ctx: &Context,
        desired: &DatabaseSpec,
        resp: &ConfigureResponse,
    ) -> String {
        let mut owner = resp
            .databases
            .iter()
            .find(|d| d.name == desired.name)
            .map(|d| d.owner.clone())
            .filter(|o| !o.is_empty());

        if owner.is_none() {
            owner = lookup_in_cluster(ctx, desired.cluster_id, |cluster| {
                cluster.find_database(&desired.name).map(|d| d.owner.clone())
            })
            .await
            .filter(|o| !o.is_empty());
        }

        first_non_empty([owner, desired.owner.clone()])
    }
}

#[async_trait]
impl ManagedResource for DatabaseReconciler {
    type Desired = DatabaseSpec;
    type State = DatabaseState;

    fn kind(&self) -> &'static str {
        "database"
    }

    fn id(&self, state: &DatabaseState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &DatabaseSpec, state: &DatabaseState) -> bool {
        desired.cluster_id != state.cluster_id() || desired.name != state.name()
    }

    fn is_converged(&self, desired: &DatabaseSpec, state: &DatabaseState) -> bool {
        !self.requires_replacement(desired, state)
            && desired
                .owner
                .as_ref()
                .is_none_or(|owner| *owner == state.owner)
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id, name = %desired.name))]
    async fn create(&self, ctx: &Context, desired: &DatabaseSpec) -> Result<DatabaseState> {
        let state = self.apply(ctx, desired).await?;
        info!(owner = %state.owner, "Database created");
        Ok(state)
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn read(&self, ctx: &Context, state: &DatabaseState) -> Result<Option<DatabaseState>> {
        let Some(cluster) = fetch_cluster(ctx, state.cluster_id())
            .await
            .context(|| format!("reading database {}", state.id))?
        else {
            return Ok(None);
        };

        match cluster.find_database(state.name()) {
            Some(db) => Ok(Some(DatabaseState {
                id: state.id.clone(),
                owner: db.owner.clone(),
            })),
            None => {
                warn!("Database no longer exists");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, ctx, desired, state), fields(id = %state.id))]
    async fn update(
        &self,
        ctx: &Context,
        desired: &DatabaseSpec,
        state: &DatabaseState,
    ) -> Result<DatabaseState> {
        let updated = self.apply(ctx, desired).await?;
        info!(from = %state.owner, to = %updated.owner, "Database owner updated");
        Ok(updated)
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn delete(&self, ctx: &Context, state: &DatabaseState) -> Result<()> {
        let req = ConfigureRequest {
            delete_databases: vec![state.name().to_string()],
            ..Default::default()
        };

        match submit_and_wait(ctx, state.cluster_id().get(), &req).await {
            Ok(_) => {
                info!("Database deleted");
                Ok(())
            }
            Err(e) if e.is_absent() => {
                info!("Database already absent");
                Ok(())
            }
            Err(e) => Err(e.within(format!("deleting database {}", state.id))),
        }
    }

    fn import_state(&self, id: &str) -> Result<DatabaseState> {
        Ok(DatabaseState {
            id: id.parse()?,
            owner: String::new(),
        })
    }
}
