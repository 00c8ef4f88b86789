//! Fetched item types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Key in [`FetchedItem::extra`] holding a short human-readable annotation
/// (hot score, reply count, ...).
pub const INFO_KEY: &str = "info";

// ============================================================================
// Fetched Item
// ============================================================================

/// A single item produced by a source.
///
/// Every fetch capability normalizes its output into this shape before it
/// is cached, so the cache never depends on source-specific types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedItem {
    /// Item title.
    pub title: String,
    /// Link to the item.
    pub url: String,
    /// Open key/value mapping for source-specific data.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl FetchedItem {
    /// Creates an item with no extra data.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            extra: Map::new(),
        }
    }

    /// Adds an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Sets the `info` annotation.
    pub fn with_info(self, info: impl Into<String>) -> Self {
        let info: String = info.into();
        self.with_extra(INFO_KEY, info)
    }

    /// Returns the `info` annotation if it is a non-empty string.
    pub fn info(&self) -> Option<&str> {
        self.extra
            .get(INFO_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Checks that the item has a title.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidItem`] when the title is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidItem(format!(
                "empty title (url: {})",
                self.url
            )));
        }
        Ok(())
    }

    /// Serializes a list of items into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra value cannot be serialized.
    pub fn list_to_value(items: &[FetchedItem]) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(items)?)
    }

    /// Deserializes a list of items from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array of items.
    pub fn list_from_value(value: Value) -> Result<Vec<FetchedItem>, CoreError> {
        Ok(serde_json::from_value(value)?)
    }
}
