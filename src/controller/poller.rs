//! Polling for cluster lifecycle transitions and job completion

use tracing::{debug, info, instrument};

use crate::client::{Cluster, ClusterStatus, JobStatus};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::retry::{Attempt, RetryPolicy, retry_until};

/// Wait until a cluster reports `active`.
///
/// `failed` aborts with the remote error message. Any status other than
/// `provisioning` is treated as a hard failure.
#[instrument(skip(ctx))]
pub async fn wait_for_cluster_active(ctx: &Context, cluster_id: i64) -> Result<Cluster> {
    let client = &ctx.client;
    let operation = format!("cluster {} to become active", cluster_id);

    let cluster = retry_until(
        &operation,
        ctx.timeouts.cluster_active,
        &ctx.cancel,
        move || async move {
            let cluster = match client.get_cluster(cluster_id).await {
                Ok(cluster) => cluster,
                Err(e) => return Attempt::Failed(e.into()),
            };
            match cluster.status.clone() {
                ClusterStatus::Active => Attempt::Ready(cluster),
                ClusterStatus::Provisioning => Attempt::Pending(None),
                ClusterStatus::Failed => Attempt::Failed(Error::ClusterFailed {
                    cluster_id,
                    message: if cluster.error_message.is_empty() {
                        "no error message reported".to_string()
                    } else {
                        cluster.error_message.clone()
                    },
                }),
                other => Attempt::Failed(Error::unexpected_cluster_status(cluster_id, &other)),
            }
        },
    )
    .await?;

    info!(cluster_id, "Cluster is active");
    Ok(cluster)
}

/// Wait until a deleted cluster is gone. A 404/410 or a `deleted` status both count.
#[instrument(skip(ctx))]
pub async fn wait_for_cluster_deleted(ctx: &Context, cluster_id: i64) -> Result<()> {
    let client = &ctx.client;
    let operation = format!("cluster {} to be deleted", cluster_id);

    retry_until(
        &operation,
        ctx.timeouts.cluster_deleted,
        &ctx.cancel,
        move || async move {
            match client.get_cluster(cluster_id).await {
                Ok(cluster) if cluster.status == ClusterStatus::Deleted => Attempt::Ready(()),
                Ok(cluster) => {
                    debug!(cluster_id, status = %cluster.status, "Cluster still present");
                    Attempt::Pending(None)
                }
                Err(e) if e.is_absent() => Attempt::Ready(()),
                Err(e) => Attempt::Failed(e.into()),
            }
        },
    )
    .await?;

    info!(cluster_id, "Cluster deleted");
    Ok(())
}

/// Wait until a cluster has no queued or running jobs.
///
/// Any failed job aborts the wait with that job's error message.
#[instrument(skip(ctx, policy))]
pub async fn wait_for_jobs_complete(
    ctx: &Context,
    cluster_id: i64,
    policy: RetryPolicy,
) -> Result<()> {
    let client = &ctx.client;
    let operation = format!("jobs on cluster {} to complete", cluster_id);

    retry_until(&operation, policy, &ctx.cancel, move || async move {
        let jobs = match client.list_active_jobs(cluster_id).await {
            Ok(jobs) => jobs,
            Err(e) => return Attempt::Failed(e.into()),
        };

        if let Some(job) = jobs.iter().find(|j| j.status == JobStatus::Failed) {
            return Attempt::Failed(Error::JobFailed {
                cluster_id,
                job_id: job.id,
                job_type: job.job_type.clone(),
                message: job.error_message.clone(),
            });
        }
        if let Some(job) = jobs
            .iter()
            .find(|j| matches!(j.status, JobStatus::Other(_)))
        {
            return Attempt::Failed(Error::unexpected_job_status(cluster_id, &job.status));
        }

        let active = jobs.iter().filter(|j| j.status.is_active()).count();
        if active == 0 {
            Attempt::Ready(())
        } else {
            debug!(cluster_id, active, "Jobs still running");
            Attempt::Pending(None)
        }
    })
    .await
}
