//! Read-only data sources

use tracing::instrument;

use crate::client::{Extension, ServerTypesResponse};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::model::{ClusterId, ClusterState};

/// Server types offered for HA clusters, with the platform default
#[instrument(skip(ctx))]
pub async fn server_types(ctx: &Context) -> Result<ServerTypesResponse> {
    ctx.client
        .list_server_types()
        .await
        .context(|| "listing server types")
}

/// Extension catalogue, optionally narrowed to one category
#[instrument(skip(ctx))]
pub async fn extensions(ctx: &Context, category: Option<&str>) -> Result<Vec<Extension>> {
    let resp = ctx
        .client
        .list_extensions()
        .await
        .context(|| "listing extensions")?;

    Ok(resp
        .extensions
        .into_iter()
        .filter(|e| category.is_none_or(|c| e.category == c))
        .collect())
}

/// Look up a cluster by identifier
#[instrument(skip(ctx))]
pub async fn cluster_info(ctx: &Context, id: &str) -> Result<ClusterState> {
    let cluster_id: ClusterId = id.parse()?;

    match ctx.client.get_cluster(cluster_id.get()).await {
        Ok(cluster) => Ok(ClusterState::from_remote(&cluster, Vec::new(), None)),
        Err(e) if e.is_absent() => Err(Error::NotFound(format!("cluster {}", cluster_id))),
        Err(e) => Err(Error::from(e).within(format!("reading cluster {}", cluster_id))),
    }
}

/// Every cluster visible to the API key
#[instrument(skip(ctx))]
pub async fn clusters(ctx: &Context) -> Result<Vec<ClusterState>> {
    let clusters = ctx
        .client
        .list_clusters()
        .await
        .context(|| "listing clusters")?;

    Ok(clusters
        .iter()
        .map(|c| ClusterState::from_remote(c, Vec::new(), None))
        .collect())
}
