//! Core error types for `HotFeed`.

use thiserror::Error;

/// Core error type for `HotFeed` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A source identifier failed validation.
    #[error("Invalid source id: {0:?}")]
    InvalidSourceId(String),

    /// An item was missing a required field.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
