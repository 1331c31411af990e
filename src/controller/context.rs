use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::controller::retry::RetryPolicy;

/// Poll intervals and deadlines for every bounded wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for a provisioned cluster to become active
    pub cluster_active: RetryPolicy,
    /// Waiting for a deleted cluster to disappear
    pub cluster_deleted: RetryPolicy,
    /// Retrying a configure call rejected with a conflict
    pub configure_conflict: RetryPolicy,
    /// Waiting for the job spawned by a configure call
    pub configure_job: RetryPolicy,
    /// Waiting for an add-node or remove-node job
    pub node_job: RetryPolicy,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            cluster_active: RetryPolicy::new(
                Duration::from_secs(15),
                Duration::from_secs(25 * 60),
            ),
            cluster_deleted: RetryPolicy::new(
                Duration::from_secs(10),
                Duration::from_secs(10 * 60),
            ),
            configure_conflict: RetryPolicy::new(
                Duration::from_secs(10),
                Duration::from_secs(2 * 60),
            ),
            configure_job: RetryPolicy::new(Duration::from_secs(10), Duration::from_secs(5 * 60)),
            node_job: RetryPolicy::new(Duration::from_secs(10), Duration::from_secs(10 * 60)),
        }
    }
}

/// Shared context for reconcilers
#[derive(Clone)]
pub struct Context {
    /// Rivestack API client
    pub client: Arc<dyn ApiClient>,
    /// Cancelled when the host aborts the run
    pub cancel: CancellationToken,
    pub timeouts: Timeouts,
}

impl Context {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
