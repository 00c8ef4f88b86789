// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `HotFeed` Sources
//!
//! Source registration and cached, failure-isolated fetching.
//!
//! - [`SourceRegistry`] - Ordered mapping from source id to fetch capability
//! - [`FetchOrchestrator`] - Memory tier, then disk tier, then a live fetch
//!   written back to both
//! - [`JsonApiSource`] - A configurable source for JSON HTTP endpoints
//!
//! ## Example
//!
//! ```ignore
//! use hotfeed_sources::{FetchOrchestrator, catalog};
//! use hotfeed_store::{Settings, TieredCache};
//! use std::sync::Arc;
//!
//! let settings = Settings::load_default()?;
//! let registry = Arc::new(catalog::build_registry(&settings)?);
//! let cache = Arc::new(TieredCache::from_settings(&settings.cache));
//! let orchestrator = FetchOrchestrator::new(cache, registry);
//!
//! let report = orchestrator.fetch_all(true, false).await;
//! for outcome in report.iter() {
//!     println!("{}: {} items", outcome.source_id, outcome.items.len());
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod json_api;
pub mod orchestrator;
pub mod registry;

pub use error::OrchestratorError;
pub use json_api::JsonApiSource;
pub use orchestrator::{FetchOrchestrator, FetchOrigin, FetchReport, SourceOutcome};
pub use registry::{Source, SourceRegistry};
