//! Volatile in-process tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

use super::{CacheEntry, CacheTier};
use crate::error::StoreError;

/// In-memory tier.
///
/// One mutex guards the map, so the check-expiry-then-delete sequence in
/// [`MemoryCache::get_at`] is atomic with respect to concurrent writers.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    /// Creates an empty tier.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up `key` as of `now`, evicting it if expired.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        let fresh = entries.get(key)?.is_fresh_at(now, self.ttl);
        if fresh {
            trace!(key, "Memory cache hit");
            entries.get(key).map(|e| e.value.clone())
        } else {
            trace!(key, "Memory cache entry expired");
            entries.remove(key);
            None
        }
    }

    /// Stores `value` for `key` as written at `now`.
    pub async fn set_at(&self, key: &str, value: Value, now: DateTime<Utc>) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), CacheEntry::new(value, now));
    }

    /// Returns true if a record for `key` is held, expired or not.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Number of held records, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if no records are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drops every record.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl CacheTier for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now()).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_at(key, value, Utc::now()).await;
        Ok(())
    }
}
