pub mod client;
pub mod config;
pub mod controller;
pub mod model;

pub use client::{ApiClient, ApiError, HttpApiClient};
pub use config::{ProviderConfig, ProviderSettings};
pub use controller::{
    Applied, ApplyOutcome, BackupConfigReconciler, ClusterReconciler, Context, DatabaseReconciler,
    Error, ExtensionReconciler, FirewallReconciler, GrantReconciler, Lifecycle, ManagedResource,
    Result, Timeouts, UserReconciler,
};
