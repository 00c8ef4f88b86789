//! JSON output formatting.

use anyhow::Result;
use hotfeed_core::FetchedItem;
use hotfeed_fetch::GenerationOutcome;
use hotfeed_sources::{FetchOrigin, Source, SourceOutcome};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

use super::limit_items;

// ============================================================================
// Output Types
// ============================================================================

/// A registered source.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_url: Option<&'a str>,
}

/// One source's fetch result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeOutput<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub origin: FetchOrigin,
    pub total: usize,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    pub items: &'a [FetchedItem],
}

/// A fetch round.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput<'a> {
    pub sources: Vec<OutcomeOutput<'a>>,
    pub duration_ms: u128,
}

/// Health-check summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput<'a> {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: Vec<&'a str>,
    pub sources: Vec<OutcomeOutput<'a>>,
    pub duration_ms: u128,
}

/// One provider attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput<'a> {
    pub provider: &'a str,
    pub role: &'static str,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u128>,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A generation call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput<'a> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<AttemptOutput<'a>>,
    pub duration_ms: u128,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_string<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    /// Formats the source listing.
    pub fn format_sources(&self, sources: &[Source]) -> Result<String> {
        let entries: Vec<SourceEntry<'_>> = sources
            .iter()
            .map(|s| SourceEntry {
                id: s.id(),
                name: s.name(),
                kind: s.kind().display_name().to_string(),
                home_url: s.info().home_url.as_deref(),
            })
            .collect();
        self.to_string(&entries)
    }

    /// Formats a fetch round. Each outcome is paired with its display name.
    pub fn format_fetch(
        &self,
        outcomes: &[(&str, &SourceOutcome)],
        top_n: Option<usize>,
        elapsed: Duration,
    ) -> Result<String> {
        let output = FetchOutput {
            sources: outcomes
                .iter()
                .map(|(name, outcome)| outcome_output(name, outcome, top_n))
                .collect(),
            duration_ms: elapsed.as_millis(),
        };
        self.to_string(&output)
    }

    /// Formats a health check.
    pub fn format_check(
        &self,
        outcomes: &[(&str, &SourceOutcome)],
        elapsed: Duration,
    ) -> Result<String> {
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(_, o)| o.source_id.as_str())
            .collect();
        let output = CheckOutput {
            checked: outcomes.len(),
            succeeded: outcomes.len() - failed.len(),
            failed,
            sources: outcomes
                .iter()
                .map(|(name, outcome)| OutcomeOutput {
                    items: &[],
                    ..outcome_output(name, outcome, None)
                })
                .collect(),
            duration_ms: elapsed.as_millis(),
        };
        self.to_string(&output)
    }

    /// Formats a generation call.
    pub fn format_generation(&self, outcome: &GenerationOutcome) -> Result<String> {
        let output = GenerationOutput {
            success: outcome.is_success(),
            text: outcome.result.as_deref().ok(),
            provider: outcome.successful_provider(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
            attempts: outcome
                .attempts
                .iter()
                .map(|a| AttemptOutput {
                    provider: &a.provider,
                    role: a.role.label(),
                    attempt: a.attempt,
                    backoff_ms: a.backoff.map(|d| d.as_millis()),
                    duration_ms: a.duration.as_millis(),
                    error: a.error.as_ref().map(ToString::to_string),
                })
                .collect(),
            duration_ms: outcome.duration.as_millis(),
        };
        self.to_string(&output)
    }
}

fn outcome_output<'a>(
    name: &'a str,
    outcome: &'a SourceOutcome,
    top_n: Option<usize>,
) -> OutcomeOutput<'a> {
    OutcomeOutput {
        id: &outcome.source_id,
        name,
        origin: outcome.origin,
        total: outcome.items.len(),
        duration_ms: outcome.duration.as_millis(),
        error: outcome.error.as_deref(),
        items: limit_items(&outcome.items, top_n),
    }
}

/// Builds the export document `{ "<source id>": [items] }` with full lists.
///
/// # Errors
///
/// Returns an error if an item cannot be serialized.
pub fn export_value(outcomes: &[SourceOutcome]) -> Result<Value> {
    let mut map = Map::new();
    for outcome in outcomes {
        map.insert(outcome.source_id.clone(), FetchedItem::list_to_value(&outcome.items)?);
    }
    Ok(Value::Object(map))
}
