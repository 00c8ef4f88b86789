//! Domain models for `HotFeed`.
//!
//! - [`item`] - Fetched items (`FetchedItem`)
//! - [`source`] - Source metadata (`SourceInfo`)

mod item;
mod source;

pub use item::FetchedItem;
pub use source::SourceInfo;
#[cfg(test)]
mod serde_tests;
