//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for source fetch operations.
///
/// Any of these is a source fetch failure from the orchestrator's point of
/// view: it is logged and the source contributes an empty result.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP layer error.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] hotfeed_core::CoreError),

    /// Anything else a collaborator wants to report.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(HttpError::Request(err))
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status code.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl HttpError {
    /// Returns true for network-level failures (connect, timeout).
    pub fn is_connection(&self) -> bool {
        match self {
            HttpError::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
