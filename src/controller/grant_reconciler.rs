//! Reconciler for user grants on databases
//!
//! The access level is upserted in place. There is no revoke endpoint, so
//! deleting a grant only drops it from state.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::client::{ConfigGrantRequest, ConfigureRequest};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::mutator::submit_and_wait;
use crate::controller::reconciler::{ManagedResource, fetch_cluster};
use crate::model::{AccessLevel, GrantId, GrantSpec, GrantState};

#[derive(Debug, Clone, Copy, Default)]
pub struct GrantReconciler;

impl GrantReconciler {
    async fn apply(&self, ctx: &Context, desired: &GrantSpec) -> Result<GrantState> {
        let id = GrantId::new(
            desired.cluster_id,
            desired.username.clone(),
            desired.database.clone(),
        );
        let req = ConfigureRequest {
            grants: vec![ConfigGrantRequest {
                username: desired.username.clone(),
                database: desired.database.clone(),
                access: desired.access.to_string(),
            }],
            ..Default::default()
        };

        submit_and_wait(ctx, id.cluster_id.get(), &req)
            .await
            .context(|| format!("granting {} access for {}", desired.access, id))?;

        Ok(GrantState {
            id,
            access: desired.access,
        })
    }
}

#[async_trait]
impl ManagedResource for GrantReconciler {
    type Desired = GrantSpec;
    type State = GrantState;

    fn kind(&self) -> &'static str {
        "grant"
    }

    fn id(&self, state: &GrantState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &GrantSpec, state: &GrantState) -> bool {
        desired.cluster_id != state.cluster_id()
            || desired.username != state.id.username
            || desired.database != state.id.database
    }

    fn is_converged(&self, desired: &GrantSpec, state: &GrantState) -> bool {
        !self.requires_replacement(desired, state) && desired.access == state.access
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id, username = %desired.username, database = %desired.database))]
    async fn create(&self, ctx: &Context, desired: &GrantSpec) -> Result<GrantState> {
        let state = self.apply(ctx, desired).await?;
        info!(access = %state.access, "Grant created");
        Ok(state)
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn read(&self, ctx: &Context, state: &GrantState) -> Result<Option<GrantState>> {
        let Some(cluster) = fetch_cluster(ctx, state.cluster_id())
            .await
            .context(|| format!("reading grant {}", state.id))?
        else {
            return Ok(None);
        };

        let Some(grant) = cluster.find_grant(&state.id.username, &state.id.database) else {
            warn!("Grant no longer exists");
            return Ok(None);
        };

        let access: AccessLevel =
            grant
                .access
                .parse()
                .map_err(|_| Error::UnexpectedStatus {
                    cluster_id: state.cluster_id().get(),
                    what: "grant access",
                    status: grant.access.clone(),
                })?;

        Ok(Some(GrantState {
            id: state.id.clone(),
            access,
        }))
    }

    #[instrument(skip(self, ctx, desired, state), fields(id = %state.id))]
    async fn update(
        &self,
        ctx: &Context,
        desired: &GrantSpec,
        state: &GrantState,
    ) -> Result<GrantState> {
        let updated = self.apply(ctx, desired).await?;
        info!(from = %state.access, to = %updated.access, "Grant access updated");
        Ok(updated)
    }

    #[instrument(skip(self, _ctx, state), fields(id = %state.id))]
    async fn delete(&self, _ctx: &Context, state: &GrantState) -> Result<()> {
        warn!(
            username = %state.id.username,
            database = %state.id.database,
            "Removing grant from state only; the API has no revoke operation, so the privileges remain on the cluster"
        );
        Ok(())
    }

    fn import_state(&self, id: &str) -> Result<GrantState> {
        Ok(GrantState {
            id: id.parse()?,
            access: AccessLevel::default(),
        })
    }
}
