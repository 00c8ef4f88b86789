//! Source registry.
//!
//! Sources are kept in registration order, which is the order listings and
//! multi-source fetches enumerate them in.

use hotfeed_core::{CoreError, SourceInfo};
use hotfeed_fetch::{FetchKind, Fetchable};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Source
// ============================================================================

/// A registered source: metadata plus its fetch capability.
#[derive(Clone)]
pub struct Source {
    info: SourceInfo,
    fetcher: Arc<dyn Fetchable>,
}

impl Source {
    /// Creates a source.
    pub fn new(info: SourceInfo, fetcher: Arc<dyn Fetchable>) -> Self {
        Self { info, fetcher }
    }

    /// Returns the metadata.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Returns the id.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the fetch capability.
    pub fn fetcher(&self) -> &Arc<dyn Fetchable> {
        &self.fetcher
    }

    /// Returns the fetch mechanism kind.
    pub fn kind(&self) -> FetchKind {
        self.fetcher.kind()
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.info.id)
            .field("name", &self.info.name)
            .field("kind", &self.kind())
            .finish()
    }
}

// ============================================================================
// Source Registry
// ============================================================================

/// Ordered mapping from source id to [`Source`].
///
/// Built once at startup, then shared read-only behind an `Arc`.
///
/// Registering an id that is already present replaces the earlier source:
/// the last registration wins and keeps the position of the first.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetch capability under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSourceId`] if the id is not usable as a
    /// cache key.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        fetcher: Arc<dyn Fetchable>,
    ) -> Result<(), CoreError> {
        self.register_source(Source::new(SourceInfo::new(id, name), fetcher))
    }

    /// Registers a prepared [`Source`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSourceId`] if the id is not usable as a
    /// cache key.
    pub fn register_source(&mut self, source: Source) -> Result<(), CoreError> {
        SourceInfo::validate_id(source.id())?;

        if let Some(existing) = self.sources.iter_mut().find(|s| s.id() == source.id()) {
            warn!(id = %source.id(), "Source registered twice, replacing earlier registration");
            *existing = source;
        } else {
            debug!(id = %source.id(), kind = %source.kind(), "Registered source");
            self.sources.push(source);
        }
        Ok(())
    }

    /// Looks up a source by id.
    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Returns true if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns all sources in registration order.
    pub fn all(&self) -> &[Source] {
        &self.sources
    }

    /// Returns all ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(Source::id).collect()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hotfeed_core::FetchedItem;
    use hotfeed_fetch::FetchError;

    struct Fixed(&'static str);

    #[async_trait]
    impl Fetchable for Fixed {
        async fn fetch(&self) -> Result<Vec<FetchedItem>, FetchError> {
            Ok(vec![FetchedItem::new(self.0, "")])
        }
    }

    fn fixed(title: &'static str) -> Arc<dyn Fetchable> {
        Arc::new(Fixed(title))
    }

    #[test]
    fn test_insertion_order() {
        let mut registry = SourceRegistry::new();
        registry.register("zhihu", "Zhihu", fixed("z")).unwrap();
        registry.register("baidu", "Baidu", fixed("b")).unwrap();
        registry.register("36kr", "36Kr", fixed("k")).unwrap();

        assert_eq!(registry.ids(), vec!["zhihu", "baidu", "36kr"]);
    }

    #[test]
    fn test_get_unknown() {
        let registry = SourceRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_last_wins_in_place() {
        let mut registry = SourceRegistry::new();
        registry.register("a", "First", fixed("old")).unwrap();
        registry.register("b", "B", fixed("b")).unwrap();
        registry.register("a", "Second", fixed("new")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["a", "b"]);

        let source = registry.get("a").unwrap();
        assert_eq!(source.name(), "Second");
        let items = source.fetcher().fetch().await.unwrap();
        assert_eq!(items[0].title, "new");
    }

    #[test]
    fn test_rejects_unsafe_id() {
        let mut registry = SourceRegistry::new();
        assert!(registry.register("../x", "X", fixed("x")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_debug_does_not_require_fetcher_debug() {
        let mut registry = SourceRegistry::new();
        registry.register("a", "A", fixed("a")).unwrap();
        assert!(format!("{registry:?}").contains("\"a\""));
    }
}
