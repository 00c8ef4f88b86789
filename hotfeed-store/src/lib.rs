// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `HotFeed` Store
//!
//! Storage for the `HotFeed` aggregator.
//!
//! This crate provides:
//!
//! - **`TieredCache`**: A volatile in-memory tier plus a durable one-file-per-key
//!   tier, both with TTL expiration
//! - **Settings**: YAML configuration with environment overrides
//! - **Persistence**: Atomic JSON file helpers and default directories
//!
//! ## Usage
//!
//! ```ignore
//! use hotfeed_store::{CacheTier, TieredCache};
//! use std::time::Duration;
//!
//! let cache = TieredCache::new("/tmp/hotfeed", Duration::from_secs(1800));
//! cache.memory().set("source_weibo", serde_json::json!([])).await?;
//! assert!(cache.memory().get("source_weibo").await.is_some());
//! ```

pub mod cache;
pub mod error;
pub mod persistence;
pub mod settings;

pub use cache::{CacheEntry, CacheTier, FileCache, MemoryCache, TieredCache};
pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_config_dir, default_config_path, ensure_dir, load_json, save_json,
};
pub use settings::{
    CacheSettings, DisplaySettings, FetchSettings, GenerationSettings, ProviderConfig,
    Settings, SourceConfig,
};

#[cfg(test)]
mod persistence_tests;
