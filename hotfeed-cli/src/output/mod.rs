//! Output formatting for CLI.

mod json;
mod text;

pub use json::{JsonFormatter, export_value};
pub use text::TextFormatter;

use hotfeed_core::FetchedItem;
use std::time::Duration;

/// Applies the display limit to a source's items.
pub fn limit_items(items: &[FetchedItem], top_n: Option<usize>) -> &[FetchedItem] {
    match top_n {
        Some(n) if n < items.len() => &items[..n],
        _ => items,
    }
}

/// Formats a duration as `340ms` or `2.41s`.
pub fn format_elapsed(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
