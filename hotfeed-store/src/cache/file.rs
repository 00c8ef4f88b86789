//! Durable one-file-per-key tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{CacheEntry, CacheTier};
use crate::error::StoreError;
use crate::persistence::save_json;

const RECORD_EXTENSION: &str = "json";

/// File-backed tier storing `<dir>/<key>.json`.
///
/// Missing, unreadable and corrupt records all read as absent. Concurrent
/// writers to the same key race with last-writer-wins; each write lands
/// through a rename so a reader never sees a partial record.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Creates a tier rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the record path for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for keys that are empty, contain a
    /// path separator, or start with a dot.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// Looks up `key` as of `now`, deleting the record if expired.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        self.get_entry_at(key, now).await.map(|entry| entry.value)
    }

    /// Looks up the full record for `key`, keeping its original `stored_at`.
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        self.get_entry_at(key, Utc::now()).await
    }

    /// Like [`FileCache::get_at`] but returns the envelope.
    pub async fn get_entry_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Skipping durable cache lookup");
                return None;
            }
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(key, "Durable cache miss");
                return None;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable cache record, treating as miss"
                );
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache record, treating as miss");
                return None;
            }
        };

        if entry.is_fresh_at(now, self.ttl) {
            trace!(key, "Durable cache hit");
            return Some(entry);
        }

        debug!(key, age_secs = entry.age_at(now).as_secs(), "Durable cache record expired");
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to delete expired cache record");
            }
        }
        None
    }

    /// Stores `value` for `key` as written at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid key or a failed write.
    pub async fn set_at(
        &self,
        key: &str,
        value: Value,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        save_json(&path, &CacheEntry::new(value, now)).await
    }

    /// Deletes every record in the cache directory.
    ///
    /// Returns the number of records removed. A missing directory counts as
    /// already empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a record cannot
    /// be removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
                && entry.file_type().await?.is_file();
            if is_record {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        debug!(dir = %self.dir.display(), removed, "Cleared durable cache");
        Ok(removed)
    }
}

#[async_trait]
impl CacheTier for FileCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now()).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_at(key, value, Utc::now()).await
    }
}
