//! Reconciler for HA clusters
//!
//! Provisioning and deletion are asynchronous on the remote side and are
//! followed by polling. Node count is the only attribute changed in place;
//! scaling adds or removes one node at a time and waits for each job before
//! issuing the next.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::client::{Cluster, ClusterStatus, RemoveNodeRequest};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::poller::{
    wait_for_cluster_active, wait_for_cluster_deleted, wait_for_jobs_complete,
};
use crate::controller::reconciler::ManagedResource;
use crate::model::cluster::MIN_NODES;
use crate::model::{ClusterId, ClusterSpec, ClusterState, node_name};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterReconciler;

impl ClusterReconciler {
    fn validate(desired: &ClusterSpec) -> Result<()> {
        if desired.node_count < MIN_NODES {
            return Err(Error::InvalidConfig(format!(
                "node_count must be at least {}, got {}",
                MIN_NODES, desired.node_count
            )));
        }
        if desired.name.trim().is_empty() {
            return Err(Error::InvalidConfig("cluster name must not be empty".into()));
        }
        Ok(())
    }

    /// Move `cluster` to `desired` nodes, one node per job.
    ///
    /// A failure stops the sequence at the last node count that was reached.
    async fn scale(&self, ctx: &Context, cluster: &Cluster, desired: u32) -> Result<()> {
        let cluster_id = cluster.id;
        let mut count = cluster.node_count;

        while count < desired {
            info!(cluster_id, from = count, to = count + 1, "Adding node");
            self.add_node(ctx, cluster_id)
                .await
                .context(|| scaling_context(cluster_id, count, desired))?;
            count += 1;
        }

        while count > desired {
            let node = node_name(&cluster.tenant_id, count);
            info!(cluster_id, node = %node, from = count, to = count - 1, "Removing node");
            self.remove_node(ctx, cluster_id, &node)
                .await
                .context(|| scaling_context(cluster_id, count, desired))?;
            count -= 1;
        }

        Ok(())
    }

    async fn add_node(&self, ctx: &Context, cluster_id: i64) -> Result<()> {
        let resp = ctx.client.add_node(cluster_id).await?;
        info!(cluster_id, node = %resp.new_node_name, job_id = resp.job_id, "Node add started");
        wait_for_jobs_complete(ctx, cluster_id, ctx.timeouts.node_job).await
    }

    async fn remove_node(&self, ctx: &Context, cluster_id: i64, node: &str) -> Result<()> {
        let resp = ctx
            .client
            .remove_node(cluster_id, &RemoveNodeRequest::decommission(node))
            .await?;
        info!(cluster_id, node = %resp.removed_node, job_id = resp.job_id, "Node removal started");
        wait_for_jobs_complete(ctx, cluster_id, ctx.timeouts.node_job).await
    }
}

/// Extensions and subscription are create-only and never returned by reads.
/// A state without them (an imported cluster) adopts the desired values in
/// place; a recorded value that differs forces replacement.
fn create_inputs_changed(desired: &ClusterSpec, state: &ClusterState) -> bool {
    let extensions_changed = !state.extensions.is_empty()
        && !same_extensions(&desired.extensions, &state.extensions);
    let subscription_changed =
        state.subscription_id.is_some() && desired.subscription_id != state.subscription_id;
    extensions_changed || subscription_changed
}

fn same_extensions(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

fn scaling_context(cluster_id: i64, reached: u32, desired: u32) -> String {
    format!(
        "scaling cluster {} to {} nodes stopped at {} nodes",
        cluster_id, desired, reached
    )
}

#[async_trait]
impl ManagedResource for ClusterReconciler {
    type Desired = ClusterSpec;
    type State = ClusterState;

    fn kind(&self) -> &'static str {
        "cluster"
    }

    fn id(&self, state: &ClusterState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &ClusterSpec, state: &ClusterState) -> bool {
        desired.name != state.name
            || desired.region != state.region
            || desired.server_type != state.server_type
            || desired.db_name != state.db_name
            || desired.db_type != state.db_type
            || desired.postgresql_version != state.postgresql_version
            || create_inputs_changed(desired, state)
    }

    fn is_converged(&self, desired: &ClusterSpec, state: &ClusterState) -> bool {
        !self.requires_replacement(desired, state)
            && desired.node_count == state.node_count
            && same_extensions(&desired.extensions, &state.extensions)
            && desired.subscription_id == state.subscription_id
    }

    #[instrument(skip(self, ctx, desired), fields(name = %desired.name, region = %desired.region))]
    async fn create(&self, ctx: &Context, desired: &ClusterSpec) -> Result<ClusterState> {
        Self::validate(desired)?;

        let resp = ctx
            .client
            .provision_cluster(&desired.provision_request())
            .await
            .context(|| format!("provisioning cluster {:?}", desired.name))?;
        info!(cluster_id = resp.id, tenant_id = %resp.tenant_id, "Cluster provisioning started");

        let cluster = wait_for_cluster_active(ctx, resp.id)
            .await
            .context(|| format!("provisioning cluster {:?} (id {})", desired.name, resp.id))?;

        Ok(ClusterState::from_remote(
            &cluster,
            desired.extensions.clone(),
            desired.subscription_id,
        ))
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn read(&self, ctx: &Context, state: &ClusterState) -> Result<Option<ClusterState>> {
        match ctx.client.get_cluster(state.id.get()).await {
            Ok(cluster) if cluster.status == ClusterStatus::Deleted => {
                warn!("Cluster has been deleted remotely");
                Ok(None)
            }
            Ok(cluster) => Ok(Some(ClusterState::from_remote(
                &cluster,
                state.extensions.clone(),
                state.subscription_id,
            ))),
            Err(e) if e.is_absent() => {
                warn!("Cluster no longer exists");
                Ok(None)
            }
            Err(e) => Err(Error::from(e).within(format!("reading cluster {}", state.id))),
        }
    }

    #[instrument(skip(self, ctx, desired, state), fields(cluster_id = %state.id))]
    async fn update(
        &self,
        ctx: &Context,
        desired: &ClusterSpec,
        state: &ClusterState,
    ) -> Result<ClusterState> {
        Self::validate(desired)?;
        let cluster_id = state.id.get();

        let current = ctx
            .client
            .get_cluster(cluster_id)
            .await
            .context(|| format!("reading cluster {}", cluster_id))?;

        if current.node_count != desired.node_count {
            info!(
                from = current.node_count,
                to = desired.node_count,
                "Scaling cluster"
            );
            self.scale(ctx, &current, desired.node_count).await?;
        }

        let cluster = ctx
            .client
            .get_cluster(cluster_id)
            .await
            .context(|| format!("reading cluster {}", cluster_id))?;

        // Either unchanged or not yet recorded
        Ok(ClusterState::from_remote(
            &cluster,
            desired.extensions.clone(),
            desired.subscription_id,
        ))
    }

    #[instrument(skip(self, ctx, state), fields(cluster_id = %state.id))]
    async fn delete(&self, ctx: &Context, state: &ClusterState) -> Result<()> {
        let cluster_id = state.id.get();

        match ctx.client.delete_cluster(cluster_id).await {
            Ok(()) => info!("Cluster deletion started"),
            Err(e) if e.is_absent() => {
                info!("Cluster already deleted");
                return Ok(());
            }
            Err(e) => {
                return Err(Error::from(e).within(format!("deleting cluster {}", cluster_id)));
            }
        }

        wait_for_cluster_deleted(ctx, cluster_id)
            .await
            .context(|| format!("deleting cluster {}", cluster_id))
    }

    fn import_state(&self, id: &str) -> Result<ClusterState> {
        let id: ClusterId = id.parse()?;
        Ok(ClusterState::seed(id))
    }
}
