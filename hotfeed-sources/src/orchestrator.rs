//! Cached, failure-isolated fetching.
//!
//! For one source the order is fixed: memory tier, disk tier (promoting a
//! hit into memory), then a live fetch bounded by a timeout whose result is
//! written through both tiers. A failed live fetch is logged and yields an
//! empty list; only an unregistered id is reported as an error.

use futures::stream::{self, StreamExt};
use hotfeed_core::{FetchedItem, SourceInfo};
use hotfeed_fetch::FetchError;
use hotfeed_store::{CacheTier, TieredCache};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::OrchestratorError;
use crate::registry::{Source, SourceRegistry};

/// Default bound on a single live fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Source Outcome
// ============================================================================

/// Where a source's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrigin {
    /// Volatile tier hit.
    MemoryCache,
    /// Durable tier hit, promoted into memory.
    DiskCache,
    /// Successful live fetch.
    Live,
    /// Live fetch failed; items are empty.
    Failed,
}

impl FetchOrigin {
    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MemoryCache => "memory",
            Self::DiskCache => "disk",
            Self::Live => "live",
            Self::Failed => "failed",
        }
    }

    /// Returns true for either cache tier.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::MemoryCache | Self::DiskCache)
    }
}

impl fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of resolving one source.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    /// Source id.
    pub source_id: String,
    /// Items, empty on failure.
    pub items: Vec<FetchedItem>,
    /// Where the items came from.
    pub origin: FetchOrigin,
    /// Failure message when `origin` is [`FetchOrigin::Failed`].
    pub error: Option<String>,
    /// Time spent resolving the source.
    pub duration: Duration,
}

impl SourceOutcome {
    fn resolved(
        source_id: &str,
        items: Vec<FetchedItem>,
        origin: FetchOrigin,
        start: Instant,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            items,
            origin,
            error: None,
            duration: start.elapsed(),
        }
    }

    fn failed(source_id: &str, error: impl fmt::Display, start: Instant) -> Self {
        Self {
            source_id: source_id.to_string(),
            items: Vec::new(),
            origin: FetchOrigin::Failed,
            error: Some(error.to_string()),
            duration: start.elapsed(),
        }
    }

    /// Returns true unless the live fetch failed.
    pub fn is_success(&self) -> bool {
        self.origin != FetchOrigin::Failed
    }
}

// ============================================================================
// Fetch Report
// ============================================================================

/// Outcomes of a multi-source fetch, in registry order.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Per-source outcomes.
    pub outcomes: Vec<SourceOutcome>,
    /// Wall-clock time for the whole round.
    pub duration: Duration,
}

impl FetchReport {
    /// Iterates outcomes in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter()
    }

    /// Returns the outcome for `source_id`.
    pub fn get(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| o.source_id == source_id)
    }

    /// Returns the items for `source_id`, empty if absent.
    pub fn items(&self, source_id: &str) -> &[FetchedItem] {
        self.get(source_id)
            .map(|o| o.items.as_slice())
            .unwrap_or_default()
    }

    /// Number of sources that did not fail.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Outcomes whose live fetch failed.
    pub fn failed(&self) -> Vec<&SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    /// Total items across all sources.
    pub fn total_items(&self) -> usize {
        self.outcomes.iter().map(|o| o.items.len()).sum()
    }

    /// Converts into a mapping from source id to items.
    pub fn into_map(self) -> HashMap<String, Vec<FetchedItem>> {
        self.outcomes
            .into_iter()
            .map(|o| (o.source_id, o.items))
            .collect()
    }
}

// ============================================================================
// Fetch Orchestrator
// ============================================================================

/// Resolves sources through the tiered cache.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    cache: Arc<TieredCache>,
    registry: Arc<SourceRegistry>,
    timeout: Duration,
    concurrency: usize,
}

impl FetchOrchestrator {
    /// Creates a sequential orchestrator with the default timeout.
    pub fn new(cache: Arc<TieredCache>, registry: Arc<SourceRegistry>) -> Self {
        Self {
            cache,
            registry,
            timeout: DEFAULT_FETCH_TIMEOUT,
            concurrency: 1,
        }
    }

    /// Sets the bound on a single live fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many sources [`fetch_all`](Self::fetch_all) runs at once.
    /// Values below one are treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Returns the cache.
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Returns the per-fetch timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the fan-out limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the items for one source.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownSource`] if the id is not
    /// registered, whether or not a cached record exists for it. Fetch
    /// failures are not errors.
    pub async fn fetch_one(
        &self,
        source_id: &str,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<Vec<FetchedItem>, OrchestratorError> {
        Ok(self
            .fetch_one_outcome(source_id, use_cache, force_refresh)
            .await?
            .items)
    }

    /// Resolves one source and reports where the items came from.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownSource`] if the id is not
    /// registered, whether or not a cached record exists for it.
    #[instrument(skip(self), fields(timeout = ?self.timeout))]
    pub async fn fetch_one_outcome(
        &self,
        source_id: &str,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<SourceOutcome, OrchestratorError> {
        let start = Instant::now();
        if SourceInfo::validate_id(source_id).is_err() {
            return Err(OrchestratorError::UnknownSource(source_id.to_string()));
        }
        let source = self
            .registry
            .get(source_id)
            .ok_or_else(|| OrchestratorError::UnknownSource(source_id.to_string()))?;
        let key = SourceInfo::cache_key_for(source_id);

        if use_cache && !force_refresh {
            if let Some((items, origin)) = self.lookup(&key).await {
                debug!(source = source_id, %origin, count = items.len(), "Cache hit");
                return Ok(SourceOutcome::resolved(source_id, items, origin, start));
            }
        }

        Ok(self.fetch_live(source, &key, use_cache, start).await)
    }

    /// Resolves every registered source.
    ///
    /// Outcomes are in registry order whatever the concurrency. A failing
    /// source yields an empty, failed outcome and does not affect the rest.
    #[instrument(skip(self), fields(sources = self.registry.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(&self, use_cache: bool, force_refresh: bool) -> FetchReport {
        let start = Instant::now();
        let ids = self.registry.ids();

        let outcomes: Vec<SourceOutcome> = if self.concurrency <= 1 {
            let mut outcomes = Vec::with_capacity(ids.len());
            for id in ids {
                outcomes.push(self.fetch_registered(id, use_cache, force_refresh).await);
            }
            outcomes
        } else {
            stream::iter(ids)
                .map(|id| self.fetch_registered(id, use_cache, force_refresh))
                .buffered(self.concurrency)
                .collect()
                .await
        };

        let report = FetchReport {
            outcomes,
            duration: start.elapsed(),
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.outcomes.len() - report.succeeded(),
            items = report.total_items(),
            elapsed_ms = report.duration.as_millis(),
            "Fetch round complete"
        );
        report
    }

    async fn fetch_registered(
        &self,
        source_id: &str,
        use_cache: bool,
        force_refresh: bool,
    ) -> SourceOutcome {
        let start = Instant::now();
        match self.fetch_one_outcome(source_id, use_cache, force_refresh).await {
            Ok(outcome) => outcome,
            Err(e) => SourceOutcome::failed(source_id, e, start),
        }
    }

    /// Memory tier, then disk tier with promotion.
    ///
    /// A promoted record keeps its durable `stored_at`, so it expires from
    /// memory when the durable record would have.
    async fn lookup(&self, key: &str) -> Option<(Vec<FetchedItem>, FetchOrigin)> {
        if let Some(value) = self.cache.memory().get(key).await {
            match FetchedItem::list_from_value(value) {
                Ok(items) => return Some((items, FetchOrigin::MemoryCache)),
                Err(e) => warn!(key, error = %e, "Memory cache value is not an item list"),
            }
        }

        let entry = self.cache.file().get_entry(key).await?;
        let items = match FetchedItem::list_from_value(entry.value.clone()) {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    key,
                    error = %e,
                    "Durable cache record is not an item list, treating as miss"
                );
                return None;
            }
        };

        self.cache
            .memory()
            .set_at(key, entry.value, entry.stored_at)
            .await;
        Some((items, FetchOrigin::DiskCache))
    }

    async fn fetch_live(
        &self,
        source: &Source,
        key: &str,
        use_cache: bool,
        start: Instant,
    ) -> SourceOutcome {
        let id = source.id();
        debug!(source = id, kind = %source.kind(), "Fetching live");

        let result = match tokio::time::timeout(self.timeout, source.fetcher().fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        let items = match result {
            Ok(items) => normalize(id, items),
            Err(e) => {
                warn!(source = id, error = %e, "Source fetch failed, returning no items");
                return SourceOutcome::failed(id, e, start);
            }
        };

        if use_cache {
            self.store(key, &items).await;
        }
        debug!(
            source = id,
            count = items.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Fetched live"
        );
        SourceOutcome::resolved(id, items, FetchOrigin::Live, start)
    }

    /// Writes through both tiers. Failures are logged only.
    async fn store(&self, key: &str, items: &[FetchedItem]) {
        let value = match FetchedItem::list_to_value(items) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Items not serializable, skipping cache write");
                return;
            }
        };

        if let Err(e) = self.cache.memory().set(key, value.clone()).await {
            warn!(key, error = %e, "Memory cache write failed");
        }
        if let Err(e) = self.cache.file().set(key, value).await {
            warn!(key, error = %e, "Durable cache write failed");
        }
    }
}

/// Drops items without a title.
fn normalize(source_id: &str, items: Vec<FetchedItem>) -> Vec<FetchedItem> {
    let total = items.len();
    let kept: Vec<FetchedItem> = items.into_iter().filter(|item| item.validate().is_ok()).collect();
    if kept.len() < total {
        debug!(source = source_id, dropped = total - kept.len(), "Dropped untitled items");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, origin: FetchOrigin, n: usize) -> SourceOutcome {
        SourceOutcome {
            source_id: id.to_string(),
            items: (0..n).map(|i| FetchedItem::new(format!("t{i}"), "")).collect(),
            origin,
            error: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_report_accessors() {
        let report = FetchReport {
            outcomes: vec![
                outcome("a", FetchOrigin::Live, 2),
                outcome("b", FetchOrigin::Failed, 0),
                outcome("c", FetchOrigin::DiskCache, 3),
            ],
            duration: Duration::ZERO,
        };

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.total_items(), 5);
        assert_eq!(report.items("c").len(), 3);
        assert!(report.items("zzz").is_empty());
        assert_eq!(report.into_map().len(), 3);
    }

    #[test]
    fn test_normalize_drops_untitled() {
        let items = vec![FetchedItem::new("keep", "u"), FetchedItem::new(" ", "u2")];
        let kept = normalize("s", items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "keep");
    }

    #[test]
    fn test_origin_labels() {
        assert!(FetchOrigin::MemoryCache.is_cached());
        assert!(!FetchOrigin::Live.is_cached());
        assert_eq!(FetchOrigin::DiskCache.to_string(), "disk");
    }
}
