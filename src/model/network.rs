//! Source-IP allowlist of a cluster

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::identifier::ClusterId;

/// Allowlist entry written when the firewall resource is destroyed
pub const ALLOW_ALL: &str = "0.0.0.0/0";

/// Desired allowlist. The set is always applied as a full replacement.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FirewallSpec {
    pub cluster_id: ClusterId,
    pub source_ips: BTreeSet<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FirewallState {
    pub id: ClusterId,
    #[serde(default)]
    pub source_ips: BTreeSet<String>,
}
