//! Reconciler for the per-cluster backup configuration
//!
//! Backup settings have their own endpoint that applies synchronously, so
//! there is no conflict retry and no job to wait for. The configuration
//! exists as long as the cluster does; destroying the resource disables
//! backups instead of removing anything.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::client::UpdateBackupConfigRequest;
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::reconciler::ManagedResource;
use crate::model::{BackupConfigSpec, BackupConfigState};

#[derive(Debug, Clone, Copy, Default)]
pub struct BackupConfigReconciler;

impl BackupConfigReconciler {
    async fn apply(&self, ctx: &Context, desired: &BackupConfigSpec) -> Result<BackupConfigState> {
        let config = ctx
            .client
            .update_backup_config(desired.cluster_id.get(), &desired.update_request())
            .await
            .context(|| format!("updating backup config of cluster {}", desired.cluster_id))?;

        info!(
            enabled = config.enabled,
            schedule = %config.schedule,
            retention_full = config.retention_full,
            "Backup config applied"
        );
        Ok(BackupConfigState::from_remote(desired.cluster_id, &config))
    }
}

#[async_trait]
impl ManagedResource for BackupConfigReconciler {
    type Desired = BackupConfigSpec;
    type State = BackupConfigState;

    fn kind(&self) -> &'static str {
        "backup"
    }

    fn id(&self, state: &BackupConfigState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &BackupConfigSpec, state: &BackupConfigState) -> bool {
        desired.cluster_id != state.id
    }

    fn is_converged(&self, desired: &BackupConfigSpec, state: &BackupConfigState) -> bool {
        !self.requires_replacement(desired, state)
            && desired.enabled == state.enabled
            && desired
                .schedule
                .as_ref()
                .is_none_or(|s| *s == state.schedule)
            && desired
                .retention_full
                .is_none_or(|r| r == state.retention_full)
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id))]
    async fn create(&self, ctx: &Context, desired: &BackupConfigSpec) -> Result<BackupConfigState> {
        self.apply(ctx, desired).await
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn read(
        &self,
        ctx: &Context,
        state: &BackupConfigState,
    ) -> Result<Option<BackupConfigState>> {
        match ctx.client.get_backup_config(state.id.get()).await {
            Ok(config) => Ok(Some(BackupConfigState::from_remote(state.id, &config))),
            Err(e) if e.is_absent() => Ok(None),
            Err(e) => Err(Error::from(e).within(format!(
                "reading backup config of cluster {}",
                state.id
            ))),
        }
    }

    #[instrument(skip(self, ctx, desired, _state), fields(cluster_id = %desired.cluster_id))]
    async fn update(
        &self,
        ctx: &Context,
        desired: &BackupConfigSpec,
        _state: &BackupConfigState,
    ) -> Result<BackupConfigState> {
        self.apply(ctx, desired).await
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn delete(&self, ctx: &Context, state: &BackupConfigState) -> Result<()> {
        let req = UpdateBackupConfigRequest {
            enabled: Some(false),
            ..Default::default()
        };

        match ctx.client.update_backup_config(state.id.get(), &req).await {
            Ok(_) => {
                info!("Backups disabled");
                Ok(())
            }
            Err(e) if e.is_absent() => Ok(()),
            Err(e) => Err(Error::from(e).within(format!(
                "disabling backups of cluster {}",
                state.id
            ))),
        }
    }

    fn import_state(&self, id: &str) -> Result<BackupConfigState> {
        Ok(BackupConfigState {
            id: id.parse()?,
            enabled: false,
            schedule: String::new(),
            retention_full: 0,
            updated_at: None,
        })
    }
}
