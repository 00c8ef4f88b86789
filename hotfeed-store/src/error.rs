//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration could not be parsed.
    #[error("Invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache key that cannot be mapped to a file name.
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    /// Returns true if the error came from the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
