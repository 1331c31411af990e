//! Desired-state and state records for every managed resource kind

pub mod access;
pub mod backup;
pub mod cluster;
pub mod extension;
pub mod identifier;
pub mod network;

pub use access::{
    AccessLevel, DatabaseSpec, DatabaseState, GrantSpec, GrantState, UserSpec, UserState,
};
pub use backup::{BackupConfigSpec, BackupConfigState};
pub use cluster::{ClusterSpec, ClusterState, node_name, parse_source_ips};
pub use extension::{ExtensionSpec, ExtensionState};
pub use identifier::{ClusterId, DatabaseId, ExtensionId, GrantId, IdentifierError, UserId};
pub use network::{ALLOW_ALL, FirewallSpec, FirewallState};
