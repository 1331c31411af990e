//! Composite identifiers for managed resources
//!
//! Formats:
//! - cluster, firewall, backup config: `cluster_id`
//! - user: `cluster_id/username`
//! - database: `cluster_id/database_name`
//! - extension: `cluster_id/extension/database`
//! - grant: `cluster_id/username/database`
//!
//! Identifiers are split into at most N parts, so the last component may
//! itself contain `/`. Every component must be non-empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse a composite identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid identifier {input:?}: {reason} (expected format: {expected})")]
pub struct IdentifierError {
    pub input: String,
    pub expected: &'static str,
    pub reason: String,
}

impl IdentifierError {
    fn new(input: &str, expected: &'static str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            expected,
            reason: reason.into(),
        }
    }
}

/// Split `input` into exactly `parts` non-empty components
fn split_components<'a>(
    input: &'a str,
    parts: usize,
    expected: &'static str,
) -> Result<Vec<&'a str>, IdentifierError> {
    let components: Vec<&str> = input.splitn(parts, '/').collect();
    if components.len() != parts {
        return Err(IdentifierError::new(
            input,
            expected,
            format!("expected {} components, found {}", parts, components.len()),
        ));
    }
    if let Some(pos) = components.iter().position(|c| c.is_empty()) {
        return Err(IdentifierError::new(
            input,
            expected,
            format!("component {} is empty", pos + 1),
        ));
    }
    Ok(components)
}

fn parse_cluster_component(
    input: &str,
    component: &str,
    expected: &'static str,
) -> Result<ClusterId, IdentifierError> {
    component
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(ClusterId)
        .ok_or_else(|| {
            IdentifierError::new(
                input,
                expected,
                format!("invalid cluster ID {:?}", component),
            )
        })
}

/// Numeric cluster identifier assigned by the remote system
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterId(pub i64);

impl ClusterId {
    pub const FORMAT: &'static str = "cluster_id";

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClusterId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentifierError::new(s, Self::FORMAT, "identifier is empty"));
        }
        parse_cluster_component(s, s, Self::FORMAT)
    }
}

impl From<i64> for ClusterId {
    fn from(id: i64) -> Self {
        ClusterId(id)
    }
}

/// Implements string conversions and serde support for an identifier type
macro_rules! string_identifier {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = IdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }
    };
}

string_identifier!(ClusterId);
string_identifier!(UserId);
string_identifier!(DatabaseId);
string_identifier!(ExtensionId);
string_identifier!(GrantId);

/// `cluster_id/username`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct UserId {
    pub cluster_id: ClusterId,
    pub username: String,
}

impl UserId {
    pub const FORMAT: &'static str = "cluster_id/username";

    pub fn new(cluster_id: ClusterId, username: impl Into<String>) -> Self {
        Self {
            cluster_id,
            username: username.into(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_id, self.username)
    }
}

impl FromStr for UserId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_components(s, 2, Self::FORMAT)?;
        Ok(Self {
            cluster_id: parse_cluster_component(s, parts[0], Self::FORMAT)?,
            username: parts[1].to_string(),
        })
    }
}

/// `cluster_id/database_name`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseId {
    pub cluster_id: ClusterId,
    pub name: String,
}

impl DatabaseId {
    pub const FORMAT: &'static str = "cluster_id/database_name";

    pub fn new(cluster_id: ClusterId, name: impl Into<String>) -> Self {
        Self {
            cluster_id,
            name: name.into(),
        }
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_id, self.name)
    }
}

impl FromStr for DatabaseId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_components(s, 2, Self::FORMAT)?;
        Ok(Self {
            cluster_id: parse_cluster_component(s, parts[0], Self::FORMAT)?,
            name: parts[1].to_string(),
        })
    }
}

/// `cluster_id/extension/database`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId {
    pub cluster_id: ClusterId,
    pub extension: String,
    pub database: String,
}

impl ExtensionId {
    pub const FORMAT: &'static str = "cluster_id/extension/database";

    pub fn new(
        cluster_id: ClusterId,
        extension: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            cluster_id,
            extension: extension.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster_id, self.extension, self.database)
    }
}

impl FromStr for ExtensionId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_components(s, 3, Self::FORMAT)?;
        Ok(Self {
            cluster_id: parse_cluster_component(s, parts[0], Self::FORMAT)?,
            extension: parts[1].to_string(),
            database: parts[2].to_string(),
        })
    }
}

/// `cluster_id/username/database`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct GrantId {
    pub cluster_id: ClusterId,
    pub username: String,
    pub database: String,
}

impl GrantId {
    pub const FORMAT: &'static str = "cluster_id/username/database";

    pub fn new(
        cluster_id: ClusterId,
        username: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            cluster_id,
            username: username.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster_id, self.username, self.database)
    }
}

impl FromStr for GrantId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_components(s, 3, Self::FORMAT)?;
        Ok(Self {
            cluster_id: parse_cluster_component(s, parts[0], Self::FORMAT)?,
            username: parts[1].to_string(),
            database: parts[2].to_string(),
        })
    }
}
