// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `HotFeed` Core
//!
//! Core types shared by every `HotFeed` crate.
//!
//! - [`FetchedItem`] - The normalized item shape every source produces
//! - [`SourceInfo`] - Descriptive metadata for a registered source
//! - [`CoreError`] - Validation and serialization errors
//!
//! Items are normalized into [`FetchedItem`] before they reach the cache
//! layer, so nothing downstream depends on source-specific types.

pub mod error;
pub mod models;

pub use error::CoreError;
pub use models::{FetchedItem, SourceInfo};
