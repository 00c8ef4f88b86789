//! Persistence and durable-tier edge case tests.

use chrono::{TimeDelta, Utc};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

use crate::cache::{CacheEntry, CacheTier, FileCache, TieredCache};
use crate::error::StoreError;
use crate::persistence::{ensure_dir, load_json, save_json};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_entry_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entry.json");
    let entry = CacheEntry::new(
        json!([{"title": "Rust 2024", "url": "https://x.test"}]),
        Utc::now(),
    );

    save_json(&path, &entry).await.unwrap();
    let loaded: CacheEntry = load_json(&path).await.unwrap();

    assert_eq!(loaded, entry);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("a").join("b").join("c").join("data.json");

    save_json(&nested, &json!({"key": "value"})).await.unwrap();

    assert!(nested.exists());
}

#[tokio::test]
async fn test_load_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let result: Result<CacheEntry, _> = load_json(&temp_dir.path().join("missing.json")).await;
    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[tokio::test]
async fn test_load_invalid_json_is_serialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    tokio::fs::write(&path, "not json at all").await.unwrap();

    let result: Result<CacheEntry, _> = load_json(&path).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_ensure_dir_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");
    ensure_dir(&dir).await.unwrap();
    ensure_dir(&dir).await.unwrap();
    assert!(dir.is_dir());
}

// ============================================================================
// Durable Tier Tests
// ============================================================================

#[tokio::test]
async fn test_truncated_record_is_miss() {
    let temp_dir = TempDir::new().unwrap();
    let cache = FileCache::new(temp_dir.path(), Duration::from_secs(60));
    cache.set("source_weibo", json!([{"title": "t", "url": "u"}])).await.unwrap();

    let path = cache.path_for("source_weibo").unwrap();
    let full = tokio::fs::read(&path).await.unwrap();
    tokio::fs::write(&path, &full[..full.len() / 2]).await.unwrap();

    assert!(cache.get("source_weibo").await.is_none());
}

#[tokio::test]
async fn test_record_survives_new_instance() {
    let temp_dir = TempDir::new().unwrap();
    FileCache::new(temp_dir.path(), Duration::from_secs(60))
        .set("k", json!("persisted"))
        .await
        .unwrap();

    let reopened = TieredCache::new(temp_dir.path(), Duration::from_secs(60));
    assert!(reopened.memory().get("k").await.is_none());
    assert_eq!(reopened.file().get("k").await, Some(json!("persisted")));
}

#[tokio::test]
async fn test_concurrent_writers_last_one_wins() {
    let temp_dir = TempDir::new().unwrap();
    let cache = FileCache::new(temp_dir.path(), Duration::from_secs(60));

    let writes = (0..8).map(|n| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.set("k", json!(n)).await })
    });
    for handle in writes.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    let value = cache.get("k").await.unwrap();
    assert!(value.as_i64().is_some_and(|n| (0..8).contains(&n)));
}

#[tokio::test]
async fn test_zero_ttl_expires_immediately_after_write() {
    let temp_dir = TempDir::new().unwrap();
    let cache = FileCache::new(temp_dir.path(), Duration::ZERO);
    let t = Utc::now();
    cache.set_at("k", json!(1), t).await.unwrap();

    assert_eq!(cache.get_at("k", t).await, Some(json!(1)));
    assert!(cache.get_at("k", t + TimeDelta::milliseconds(1)).await.is_none());
}
