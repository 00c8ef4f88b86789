//! Text output formatting with colors.

use hotfeed_core::FetchedItem;
use hotfeed_fetch::GenerationOutcome;
use hotfeed_sources::{FetchOrigin, Source, SourceOutcome};
use std::time::Duration;

use super::{format_elapsed, limit_items};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Formats the source listing: `1. weibo - Weibo`.
    pub fn format_source_list(&self, sources: &[Source]) -> String {
        if sources.is_empty() {
            return self.dim("No sources configured.");
        }
        let mut lines = vec![self.bold("Available sources:")];
        for (idx, source) in sources.iter().enumerate() {
            lines.push(format!("{}. {} - {}", idx + 1, self.cyan(source.id()), source.name()));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Fetch Output
    // ========================================================================

    /// Formats one source's items under a `=== Name (N items) ===` header.
    pub fn format_outcome(
        &self,
        name: &str,
        outcome: &SourceOutcome,
        top_n: Option<usize>,
    ) -> String {
        let mut lines = vec![format!(
            "{} {}",
            self.bold(&format!("=== {name} ({} items) ===", outcome.items.len())),
            self.dim(&format!(
                "[{}, {}]",
                self.origin_label(outcome.origin),
                format_elapsed(outcome.duration)
            ))
        )];

        if let Some(ref error) = outcome.error {
            lines.push(self.red(&format!("Fetch failed: {error}")));
            return lines.join("\n");
        }

        let shown = limit_items(&outcome.items, top_n);
        if shown.len() < outcome.items.len() {
            lines.push(self.dim(&format!("(showing first {})", shown.len())));
        }
        for (idx, item) in shown.iter().enumerate() {
            lines.push(self.format_item(idx + 1, item));
        }
        lines.join("\n")
    }

    /// Formats one item: title, then indented link and info.
    pub fn format_item(&self, idx: usize, item: &FetchedItem) -> String {
        let mut lines = vec![format!("{idx}. {}", item.title)];
        if !item.url.is_empty() {
            lines.push(format!("   {}", self.cyan(&item.url)));
        }
        if let Some(info) = item.info() {
            lines.push(format!("   {}", self.dim(info)));
        }
        lines.join("\n")
    }

    /// Formats the closing elapsed-time line.
    pub fn format_elapsed_line(&self, label: &str, elapsed: Duration) -> String {
        format!("{label}: {}", format_elapsed(elapsed))
    }

    fn origin_label(&self, origin: FetchOrigin) -> String {
        match origin {
            FetchOrigin::MemoryCache | FetchOrigin::DiskCache => {
                self.yellow(&format!("cached: {origin}"))
            }
            FetchOrigin::Live => self.green(origin.label()),
            FetchOrigin::Failed => self.red(origin.label()),
        }
    }

    // ========================================================================
    // Check Output
    // ========================================================================

    /// Formats one health-check row.
    pub fn format_check_line(&self, name: &str, outcome: &SourceOutcome) -> String {
        let label = format!("{name} ({})", outcome.source_id);
        match outcome.error {
            None => format!(
                "{} {label:<30} {:>4} items  {}",
                self.green("✓"),
                outcome.items.len(),
                format_elapsed(outcome.duration)
            ),
            Some(ref error) => format!("{} {label:<30} {}", self.red("✗"), self.red(error)),
        }
    }

    /// Formats the health-check summary.
    pub fn format_check_summary(&self, outcomes: &[SourceOutcome], elapsed: Duration) -> String {
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.source_id.as_str())
            .collect();
        let succeeded = outcomes.len() - failed.len();
        let items: usize = outcomes.iter().map(|o| o.items.len()).sum();

        let mut lines = vec![format!(
            "Checked {} sources in {}: {} ok, {} failed, {items} items",
            outcomes.len(),
            format_elapsed(elapsed),
            self.green(&succeeded.to_string()),
            if failed.is_empty() {
                failed.len().to_string()
            } else {
                self.red(&failed.len().to_string())
            },
        )];
        if !failed.is_empty() {
            lines.push(format!("Failed: {}", failed.join(", ")));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Generation Output
    // ========================================================================

    /// Formats the attempt log of a generation call.
    pub fn format_attempts(&self, outcome: &GenerationOutcome) -> String {
        let mut lines = Vec::with_capacity(outcome.attempts.len());
        for attempt in &outcome.attempts {
            let status = match attempt.error {
                None => self.green("ok"),
                Some(ref e) => self.red(&e.to_string()),
            };
            let backoff = attempt
                .backoff
                .map(|d| format!(" after {} backoff", format_elapsed(d)))
                .unwrap_or_default();
            lines.push(format!(
                "  {} {} #{}{backoff} ({}): {status}",
                attempt.role.label(),
                attempt.provider,
                attempt.attempt,
                format_elapsed(attempt.duration),
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color Helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}
