pub mod backup_reconciler;
pub mod catalog;
pub mod cluster_reconciler;
pub mod context;
pub mod database_reconciler;
pub mod error;
pub mod extension_reconciler;
pub mod firewall_reconciler;
pub mod grant_reconciler;
pub mod mutator;
pub mod orchestrator;
pub mod poller;
pub mod reconciler;
pub mod retry;
pub mod state_machine;
pub mod user_reconciler;

pub use backup_reconciler::BackupConfigReconciler;
pub use cluster_reconciler::ClusterReconciler;
pub use context::{Context, Timeouts};
pub use database_reconciler::DatabaseReconciler;
pub use error::{Error, Result};
pub use extension_reconciler::ExtensionReconciler;
pub use firewall_reconciler::FirewallReconciler;
pub use grant_reconciler::GrantReconciler;
pub use mutator::{configure_with_retry, retry_on_conflict, submit_and_wait};
pub use orchestrator::{Applied, ApplyOutcome, Lifecycle};
pub use poller::{wait_for_cluster_active, wait_for_cluster_deleted, wait_for_jobs_complete};
pub use reconciler::ManagedResource;
pub use retry::{Attempt, RetryPolicy, retry_until};
pub use state_machine::{LifecycleEvent, ResourcePhase, ResourceStateMachine, TransitionResult};
pub use user_reconciler::UserReconciler;
