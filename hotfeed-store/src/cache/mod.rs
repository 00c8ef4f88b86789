//! Two-tier cache with TTL expiration.
//!
//! Both tiers implement [`CacheTier`]. The [`MemoryCache`] is lost on
//! restart; the [`FileCache`] keeps one `<key>.json` record per key.
//! An entry is visible while `now - stored_at <= ttl` and is deleted on
//! the first access after that.
//!
//! The tiers do not know about each other. Lookup order and promotion
//! from the durable tier into memory are decided by the caller.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StoreError;
use crate::settings::CacheSettings;

pub use file::FileCache;
pub use memory::MemoryCache;

// ============================================================================
// Cache Entry
// ============================================================================

/// A cached value and the moment it was stored.
///
/// Serialized as `{"value": ..., "storedAt": "<RFC 3339>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Stored value.
    pub value: Value,
    /// Time of the write that produced this entry.
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stored at `now`.
    pub fn new(value: Value, now: DateTime<Utc>) -> Self {
        Self {
            value,
            stored_at: now,
        }
    }

    /// Age of the entry at `now`. Entries from the future have zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns true if the entry is still visible at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) <= ttl
    }
}

// ============================================================================
// Tier Contract
// ============================================================================

/// A single backing store.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Returns the value for `key`, or `None` when absent or expired.
    ///
    /// Never fails: unreadable records count as absent.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Replaces the entry for `key` with a fresh one.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

// ============================================================================
// Tiered Cache
// ============================================================================

/// The volatile and durable tiers sharing one TTL.
///
/// Build it once at startup and share it behind an `Arc`.
#[derive(Debug)]
pub struct TieredCache {
    memory: MemoryCache,
    file: FileCache,
}

impl TieredCache {
    /// Creates both tiers with the same TTL.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(ttl),
            file: FileCache::new(dir, ttl),
        }
    }

    /// Creates the cache described by the settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.dir.clone(), settings.ttl())
    }

    /// Returns the volatile tier.
    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Returns the durable tier.
    pub fn file(&self) -> &FileCache {
        &self.file
    }

    /// Returns the shared TTL.
    pub fn ttl(&self) -> Duration {
        self.memory.ttl()
    }
}
