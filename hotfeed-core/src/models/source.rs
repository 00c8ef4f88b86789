//! Source metadata.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Descriptive metadata for a registered source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `weibo`, `hackernews`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional home page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_url: Option<String>,
}

impl SourceInfo {
    /// Creates source metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            home_url: None,
        }
    }

    /// Sets the home page.
    pub fn with_home_url(mut self, url: impl Into<String>) -> Self {
        self.home_url = Some(url.into());
        self
    }

    /// Returns the cache key for this source.
    pub fn cache_key(&self) -> String {
        Self::cache_key_for(&self.id)
    }

    /// Returns the cache key for a source id: `source_<id>`.
    pub fn cache_key_for(id: &str) -> String {
        format!("source_{id}")
    }

    /// Validates a source id.
    ///
    /// Ids double as cache file names, so they are restricted to ASCII
    /// alphanumerics, `-` and `_`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSourceId`] for empty ids or ids with
    /// other characters.
    pub fn validate_id(id: &str) -> Result<(), CoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(CoreError::InvalidSourceId(id.to_string()))
        }
    }
}
