//! Bounded retry with classified outcomes
//!
//! Both the job/state poller and the conflict-retrying mutator are built on
//! [`retry_until`]: each attempt is classified as ready, still pending, or
//! failed, and pending attempts are repeated on a fixed interval until a
//! deadline. Every sleep races the cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::controller::error::{Error, Result};

/// Fixed-interval retry schedule with an overall deadline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between attempts
    pub interval: Duration,
    /// Total time budget, measured from the first attempt
    pub deadline: Duration,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Classified outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// Terminal success
    Ready(T),
    /// Not there yet; the optional message is reported if the deadline passes
    Pending(Option<String>),
    /// Terminal failure, returned as is
    Failed(Error),
}

/// Run `attempt` until it is ready or failed, the deadline passes, or `cancel` fires.
///
/// Returns [`Error::Timeout`] carrying the last pending message when the
/// deadline elapses, and [`Error::Cancelled`] when the token fires first.
pub async fn retry_until<T, F, Fut>(
    operation: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let started = Instant::now();
    let mut last_error: Option<String> = None;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(operation.to_string()));
        }

        attempts += 1;
        match attempt().await {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Failed(e) => return Err(e),
            Attempt::Pending(reason) => {
                debug!(operation, attempts, reason = ?reason, "Still waiting");
                if reason.is_some() {
                    last_error = reason;
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.deadline {
            return Err(Error::Timeout {
                operation: operation.to_string(),
                elapsed,
                last_error,
            });
        }

        let pause = policy.interval.min(policy.deadline - elapsed);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(operation.to_string()));
            }
            _ = sleep(pause) => {}
        }
    }
}
