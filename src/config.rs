//! Provider configuration
//!
//! Values resolve in layers: explicit settings, then environment variables,
//! then built-in defaults. Resolution happens once at startup and produces an
//! immutable [`ProviderConfig`] that is handed to the API client.

use std::fmt;

use serde::Deserialize;

use crate::controller::error::{Error, Result};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "RIVESTACK_API_KEY";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "RIVESTACK_BASE_URL";

/// Base URL used when neither settings nor environment provide one
pub const DEFAULT_BASE_URL: &str = "https://api.rivestack.io";

/// Explicitly supplied settings (CLI flags or a config file)
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Resolved, immutable provider configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub user_agent: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn resolve(settings: &ProviderSettings) -> Result<Self> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment
    pub fn resolve_with<F>(settings: &ProviderSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = first_non_empty(settings.api_key.clone(), || lookup(API_KEY_ENV))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "the API key must be set in the provider configuration or via the {} environment variable",
                    API_KEY_ENV
                ))
            })?;

        let base_url = first_non_empty(settings.base_url.clone(), || lookup(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: format!("rivestack-provider/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}

fn first_non_empty<F>(explicit: Option<String>, fallback: F) -> Option<String>
where
    F: FnOnce() -> Option<String>,
{
    explicit
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback().filter(|v| !v.trim().is_empty()))
}
