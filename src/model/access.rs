//! Users, databases, and grants scoped to a cluster

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::identifier::{ClusterId, DatabaseId, GrantId, UserId};

/// Desired database user. Every field is immutable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserSpec {
    pub cluster_id: ClusterId,
    pub username: String,
}

/// A database user; the password is only ever known from the create response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserState {
    pub id: UserId,
    #[serde(default)]
    pub password: String,
}

impl UserState {
    pub fn cluster_id(&self) -> ClusterId {
        self.id.cluster_id
    }

    pub fn username(&self) -> &str {
        &self.id.username
    }
}

/// Desired database. The owner may change in place.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub cluster_id: ClusterId,
    pub name: String,
    /// Owning role; the remote default owner is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DatabaseState {
    pub id: DatabaseId,
    #[serde(default)]
    pub owner: String,
}

impl DatabaseState {
    pub fn cluster_id(&self) -> ClusterId {
        self.id.cluster_id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }
}

/// Access level of a grant
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Read,
    Write,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessLevel::Read),
            "write" => Ok(AccessLevel::Write),
            other => Err(format!("unknown access level {:?}", other)),
        }
    }
}

/// Desired grant of a user on a database
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GrantSpec {
    pub cluster_id: ClusterId,
    pub username: String,
    pub database: String,
    #[serde(default)]
    pub access: AccessLevel,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GrantState {
    pub id: GrantId,
    pub access: AccessLevel,
}

impl GrantState {
    pub fn cluster_id(&self) -> ClusterId {
        self.id.cluster_id
    }
}
