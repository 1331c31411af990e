//! Configuration mutations that absorb `409 Conflict` responses
//!
//! The remote side allows one active configuration job per cluster and
//! rejects overlapping mutations instead of queueing them. Conflicts are
//! retried on a fixed interval; every other error is returned at once.

use std::future::Future;

use tracing::{debug, info};

use crate::client::{ApiResult, ConfigureRequest, ConfigureResponse};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::poller::wait_for_jobs_complete;
use crate::controller::retry::{Attempt, retry_until};

/// Invoke `call` until it stops returning a conflict or the conflict deadline passes
pub async fn retry_on_conflict<T, F, Fut>(ctx: &Context, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    retry_until(operation, ctx.timeouts.configure_conflict, &ctx.cancel, || {
        let fut = call();
        async move {
            match fut.await {
                Ok(value) => Attempt::Ready(value),
                Err(e) if e.is_conflict() => {
                    debug!(operation, error = %e, "Cluster busy, retrying");
                    Attempt::Pending(Some(e.to_string()))
                }
                Err(e) => Attempt::Failed(e.into()),
            }
        }
    })
    .await
}

/// Submit a configure envelope, retrying on conflict
pub async fn configure_with_retry(
    ctx: &Context,
    cluster_id: i64,
    req: &ConfigureRequest,
) -> Result<ConfigureResponse> {
    let client = &ctx.client;
    retry_on_conflict(
        ctx,
        &format!("configure on cluster {}", cluster_id),
        move || client.configure(cluster_id, req),
    )
    .await
}

/// Submit a configure envelope and wait for the job it spawns, if any
pub async fn submit_and_wait(
    ctx: &Context,
    cluster_id: i64,
    req: &ConfigureRequest,
) -> Result<ConfigureResponse> {
    let resp = configure_with_retry(ctx, cluster_id, req).await?;
    if resp.spawned_job() {
        info!(cluster_id, job_id = resp.job_id, "Waiting for configure job");
        wait_for_jobs_complete(ctx, cluster_id, ctx.timeouts.configure_job).await?;
    }
    Ok(resp)
}
