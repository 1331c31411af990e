//! Error types for the reconciliation layer

use std::time::Duration;

use thiserror::Error;

use crate::client::{ApiError, ClusterStatus, JobStatus};
use crate::controller::state_machine::{LifecycleEvent, ResourcePhase};
use crate::model::IdentifierError;

/// Error variants are named by the failure they describe (e.g., `JobFailed`, `Timeout`).
/// Absence, conflicts, and timeouts are distinguishable so callers can decide
/// whether to drop state, retry later, or give up.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ApiError(#[from] ApiError),

    #[error(transparent)]
    IdentifierError(#[from] IdentifierError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("cluster {cluster_id} failed: {message}")]
    ClusterFailed { cluster_id: i64, message: String },

    #[error("job {job_id} ({job_type}) on cluster {cluster_id} failed: {message}")]
    JobFailed {
        cluster_id: i64,
        job_id: i64,
        job_type: String,
        message: String,
    },

    #[error("cluster {cluster_id} reported unexpected {what} status {status:?}")]
    UnexpectedStatus {
        cluster_id: i64,
        what: &'static str,
        status: String,
    },

    #[error("timed out after {elapsed:?} waiting for {operation}{}", last_error_suffix(.last_error))]
    Timeout {
        operation: String,
        elapsed: Duration,
        last_error: Option<String>,
    },

    #[error("{0} cancelled")]
    Cancelled(String),

    #[error("update is not supported for {0}; changes require replacement")]
    UpdateUnsupported(String),

    #[error("invalid lifecycle transition from {current} on {event}")]
    InvalidTransition {
        current: ResourcePhase,
        event: LifecycleEvent,
    },

    #[error("{context}: {source}")]
    Reconcile {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl Error {
    /// Wrap this error with the operation or entity it occurred in
    pub fn within(self, context: impl Into<String>) -> Self {
        Error::Reconcile {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn unexpected_cluster_status(cluster_id: i64, status: &ClusterStatus) -> Self {
        Error::UnexpectedStatus {
            cluster_id,
            what: "cluster",
            status: status.to_string(),
        }
    }

    pub fn unexpected_job_status(cluster_id: i64, status: &JobStatus) -> Self {
        Error::UnexpectedStatus {
            cluster_id,
            what: "job",
            status: status.to_string(),
        }
    }

    /// The innermost error, looking through context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Reconcile { source, .. } => source.root(),
            other => other,
        }
    }

    /// The remote entity no longer exists (404/410 or an empty lookup)
    pub fn is_absent(&self) -> bool {
        match self.root() {
            Error::ApiError(e) => e.is_absent(),
            Error::NotFound(_) => true,
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Error::ApiError(e) if e.is_conflict())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::Timeout { .. })
    }

    /// The remote side reported a failed job or cluster
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self.root(),
            Error::JobFailed { .. } | Error::ClusterFailed { .. }
        )
    }

    /// Check if running the same operation again may succeed
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Error::ApiError(e) => match e {
                ApiError::Conflict(_) | ApiError::Transport(_) | ApiError::Cancelled => true,
                // 4xx errors (except 429 TooManyRequests) are not retryable
                ApiError::Status { status, .. } => *status == 429 || *status >= 500,
                ApiError::NotFound(_) | ApiError::Gone(_) | ApiError::Decode(_) => false,
            },
            // The remote job may still finish; a later run re-diffs from there
            Error::Timeout { .. } => true,
            Error::Cancelled(_) => true,
            Error::IdentifierError(_)
            | Error::SerializationError(_)
            | Error::InvalidConfig(_)
            | Error::NotFound(_)
            | Error::ClusterFailed { .. }
            | Error::JobFailed { .. }
            | Error::UnexpectedStatus { .. }
            | Error::UpdateUnsupported(_)
            | Error::InvalidTransition { .. } => false,
            Error::Reconcile { .. } => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attach context to the error of a fallible reconcile step
pub trait ResultExt<T> {
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().within(f()))
    }
}
