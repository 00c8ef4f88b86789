//! The fetch capability contract.
//!
//! A source is anything that can produce a list of [`FetchedItem`]s. The
//! orchestrator owns caching, failure isolation and timeouts; a fetchable
//! only fetches. Authentication, rate limiting and parsing stay inside the
//! implementation.

use async_trait::async_trait;
use hotfeed_core::FetchedItem;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchError;

// ============================================================================
// Fetch Kind
// ============================================================================

/// The kind of mechanism a source uses to produce items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Structured JSON API.
    #[default]
    Api,
    /// HTML crawler.
    Crawler,
    /// RSS/Atom style feed.
    Feed,
    /// Output of a generation provider.
    Generated,
}

impl FetchKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::Crawler => "Crawler",
            Self::Feed => "Feed",
            Self::Generated => "Generated",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Fetchable Trait
// ============================================================================

/// A source's fetch capability.
///
/// ## Implementing a Source
///
/// ```ignore
/// struct HackerNews {
///     http: HttpClient,
/// }
///
/// #[async_trait]
/// impl Fetchable for HackerNews {
///     async fn fetch(&self) -> Result<Vec<FetchedItem>, FetchError> {
///         let stories: Vec<Story> = self.http.get_json(TOP_STORIES_URL).await?;
///         Ok(stories.into_iter().map(Story::into_item).collect())
///     }
/// }
/// ```
///
/// ## Errors
///
/// Any [`FetchError`] is treated as a transient source failure: the
/// orchestrator logs it and reports an empty item list for the source.
#[async_trait]
pub trait Fetchable: Send + Sync {
    /// The kind of fetch mechanism (informational).
    fn kind(&self) -> FetchKind {
        FetchKind::Api
    }

    /// Fetches the current list of items.
    async fn fetch(&self) -> Result<Vec<FetchedItem>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Fetchable for Fixed {
        async fn fetch(&self) -> Result<Vec<FetchedItem>, FetchError> {
            Ok(vec![FetchedItem::new("a", "https://a")])
        }
    }

    #[test]
    fn test_fetch_kind_display() {
        assert_eq!(FetchKind::Api.to_string(), "API");
        assert_eq!(FetchKind::Crawler.display_name(), "Crawler");
    }

    #[tokio::test]
    async fn test_default_kind_and_object_safety() {
        let source: Box<dyn Fetchable> = Box::new(Fixed);
        assert_eq!(source.kind(), FetchKind::Api);
        assert_eq!(source.fetch().await.unwrap().len(), 1);
    }
}
