//! Error types for the Rivestack API gateway

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the remote API, classified by HTTP status.
///
/// The reconcilers only care about four categories: the target is gone
/// (`NotFound`/`Gone`), the cluster is busy (`Conflict`), or anything else.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API error (HTTP 404): {0}")]
    NotFound(String),

    #[error("API error (HTTP 409): {0}")]
    Conflict(String),

    #[error("API error (HTTP 410): {0}")]
    Gone(String),

    #[error("API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,
}

/// Result type for gateway calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error body returned by the API: `{"error": true, "code": 404, "message": "..."}`
#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl ApiError {
    /// Build a classified error from a failed response.
    ///
    /// The message comes from the JSON error body when it decodes, otherwise
    /// the raw body, otherwise the canonical reason phrase for the status.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let mut message = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.message,
            Err(_) => String::from_utf8_lossy(body).trim().to_string(),
        };
        if message.is_empty() {
            message = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown error")
                .to_string();
        }

        match status {
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            410 => ApiError::Gone(message),
            _ => ApiError::Status { status, message },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// The cluster already has an active job and rejected the mutation
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, ApiError::Gone(_))
    }

    /// The target no longer exists (404 or 410)
    pub fn is_absent(&self) -> bool {
        self.is_not_found() || self.is_gone()
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::Gone(_) => Some(410),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::Cancelled => None,
        }
    }
}
