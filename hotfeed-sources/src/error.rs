//! Orchestrator error types.

use thiserror::Error;

/// Errors surfaced to callers of the orchestrator.
///
/// Source fetch failures are not here: they are absorbed into an empty
/// result for that source.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The requested id is not registered.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// A configured source could not be constructed.
    #[error("Invalid source {id}: {reason}")]
    InvalidSource {
        /// Source id from the configuration.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl OrchestratorError {
    /// Returns true for the caller-error case of an unregistered id.
    pub fn is_unknown_source(&self) -> bool {
        matches!(self, Self::UnknownSource(_))
    }
}
