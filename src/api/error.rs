//! Failure taxonomy for calls to the remote prompt store.

use serde_json::Value;
use thiserror::Error;

/// Machine-readable reasons the remote store sends with conflict responses.
pub mod reasons {
    pub const ALREADY_UPVOTED: &str = "Already upvoted";
    pub const NOT_UPVOTED: &str = "Not upvoted";
}

/// A failed remote call.
///
/// `Clone` so a failed response can be shared by every caller that was
/// coalesced onto the same request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Could not reach the prompt server: {0}")]
    Network(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Request failed with status {status}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Status { status: u16, reason: Option<String> },

    #[error("Unexpected response from the prompt server: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success response from its status and body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if status == 401 {
            return ApiError::Unauthorized;
        }
        ApiError::Status {
            status,
            reason: extract_reason(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ApiError::Status { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// True for a response with exactly this status and reason string.
    pub fn is_reason(&self, status: u16, reason: &str) -> bool {
        self.status() == Some(status) && self.reason() == Some(reason)
    }
}

/// Read the reason from an error body.
///
/// The remote store answers `{"detail": "..."}`; request validation failures
/// carry a list of `{"msg": "..."}` objects instead.
fn extract_reason(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("message"))?;

    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(String::from),
        _ => None,
    }
}
