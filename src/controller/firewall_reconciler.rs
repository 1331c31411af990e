//! Reconciler for the source-IP allowlist
//!
//! The desired set is always submitted whole with `replace_ips`, never as an
//! add/remove diff. Destroying the resource resets the allowlist to allow-all
//! rather than an empty list, which the remote side would read ambiguously.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::client::ConfigureRequest;
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::mutator::submit_and_wait;
use crate::controller::reconciler::{ManagedResource, fetch_cluster};
use crate::model::{ALLOW_ALL, FirewallSpec, FirewallState, parse_source_ips};

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallReconciler;

impl FirewallReconciler {
    async fn replace(&self, ctx: &Context, desired: &FirewallSpec) -> Result<FirewallState> {
        if desired.source_ips.is_empty() {
            return Err(Error::InvalidConfig(
                "source_ips must contain at least one address or CIDR range".into(),
            ));
        }

        let req = ConfigureRequest {
            source_ips: desired.source_ips.iter().cloned().collect(),
            replace_ips: true,
            ..Default::default()
        };
        submit_and_wait(ctx, desired.cluster_id.get(), &req)
            .await
            .context(|| format!("replacing allowlist of cluster {}", desired.cluster_id))?;

        info!(count = desired.source_ips.len(), "Allowlist replaced");
        Ok(FirewallState {
            id: desired.cluster_id,
            source_ips: desired.source_ips.clone(),
        })
    }
}

#[async_trait]
impl ManagedResource for FirewallReconciler {
    type Desired = FirewallSpec;
    type State = FirewallState;

    fn kind(&self) -> &'static str {
        "firewall"
    }

    fn id(&self, state: &FirewallState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &FirewallSpec, state: &FirewallState) -> bool {
        desired.cluster_id != state.id
    }

    fn is_converged(&self, desired: &FirewallSpec, state: &FirewallState) -> bool {
        !self.requires_replacement(desired, state) && desired.source_ips == state.source_ips
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id))]
    async fn create(&self, ctx: &Context, desired: &FirewallSpec) -> Result<FirewallState> {
        self.replace(ctx, desired).await
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn read(&self, ctx: &Context, state: &FirewallState) -> Result<Option<FirewallState>> {
        let cluster = fetch_cluster(ctx, state.id)
            .await
            .context(|| format!("reading allowlist of cluster {}", state.id))?;

        Ok(cluster.map(|cluster| FirewallState {
            id: state.id,
            source_ips: parse_source_ips(&cluster.source_ips),
        }))
    }

    #[instrument(skip(self, ctx, desired, _state), fields(cluster_id = %desired.cluster_id))]
    async fn update(
        &self,
        ctx: &Context,
        desired: &FirewallSpec,
        _state: &FirewallState,
    ) -> Result<FirewallState> {
        self.replace(ctx, desired).await
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn delete(&self, ctx: &Context, state: &FirewallState) -> Result<()> {
        let req = ConfigureRequest {
            source_ips: vec![ALLOW_ALL.to_string()],
            replace_ips: true,
            ..Default::default()
        };

        match submit_and_wait(ctx, state.id.get(), &req).await {
            Ok(_) => {
                info!("Allowlist reset to {}", ALLOW_ALL);
                Ok(())
            }
            Err(e) if e.is_absent() => Ok(()),
            Err(e) => Err(e.within(format!("resetting allowlist of cluster {}", state.id))),
        }
    }

    fn import_state(&self, id: &str) -> Result<FirewallState> {
        Ok(FirewallState {
            id: id.parse()?,
            source_ips: Default::default(),
        })
    }
}
