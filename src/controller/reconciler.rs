//! Reconciler contract shared by every managed resource kind
//!
//! A reconciler maps one resource kind onto the remote API: create, read,
//! update, and delete a single entity, plus the policy deciding whether a
//! desired-state change can be applied in place or needs replacement.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::client::Cluster;
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::model::ClusterId;

#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Desired state supplied by the operator
    type Desired: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;
    /// State record persisted between runs
    type State: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Kind name used in logs and on the command line, e.g. `database`
    fn kind(&self) -> &'static str;

    /// Composite identifier of a state record
    fn id(&self, state: &Self::State) -> String;

    /// Whether moving from `state` to `desired` needs destroy and recreate
    fn requires_replacement(&self, desired: &Self::Desired, state: &Self::State) -> bool;

    /// Whether `state` already satisfies `desired`
    fn is_converged(&self, desired: &Self::Desired, state: &Self::State) -> bool;

    async fn create(&self, ctx: &Context, desired: &Self::Desired) -> Result<Self::State>;

    /// Refresh a state record. `None` means the entity no longer exists.
    async fn read(&self, ctx: &Context, state: &Self::State) -> Result<Option<Self::State>>;

    async fn update(
        &self,
        ctx: &Context,
        desired: &Self::Desired,
        state: &Self::State,
    ) -> Result<Self::State>;

    /// Delete the entity. Absence counts as success.
    async fn delete(&self, ctx: &Context, state: &Self::State) -> Result<()>;

    /// Parse a composite identifier into a placeholder state for the next read
    fn import_state(&self, id: &str) -> Result<Self::State>;
}

/// Re-read the full cluster aggregate, mapping 404/410 to `None`
pub async fn fetch_cluster(ctx: &Context, cluster_id: ClusterId) -> Result<Option<Cluster>> {
    match ctx.client.get_cluster(cluster_id.get()).await {
        Ok(cluster) => Ok(Some(cluster)),
        Err(e) if e.is_absent() => {
            warn!(cluster_id = %cluster_id, "Cluster no longer exists");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fallback lookup used after a create whose response lacked a generated value.
///
/// Failures are logged and treated as "not found" since the entity itself
/// was already created.
pub async fn lookup_in_cluster<T, F>(ctx: &Context, cluster_id: ClusterId, find: F) -> Option<T>
where
    T: Send,
    F: FnOnce(&Cluster) -> Option<T> + Send,
{
    match ctx.client.get_cluster(cluster_id.get()).await {
        Ok(cluster) => find(&cluster),
        Err(e) => {
            warn!(cluster_id = %cluster_id, error = %e, "Could not re-read cluster after create");
            None
        }
    }
}

/// First non-empty candidate, or an empty placeholder
pub fn first_non_empty<I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}
