//! Generation-provider abstraction and failover.
//!
//! A [`GenerationProvider`] turns a prompt into text, either in one piece or
//! as a stream of chunks. Provider errors are classified into
//! [`ProviderErrorKind`]s so the [`FailoverClient`] can decide between
//! retrying the same provider and failing over to the secondary.

mod failover;
mod openai;
mod sse;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use thiserror::Error;

pub use failover::{
    CallMode, FailoverClient, GenerationOutcome, ProviderAttempt, ProviderChain, ProviderRole,
};
pub use openai::{OpenAiCompatibleProvider, OpenAiConfig};

/// A stream of incremental text chunks.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

// ============================================================================
// Provider Error
// ============================================================================

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Network/connect failure or timeout. Retried against the same provider.
    Connection,
    /// Content blocked or policy rejection. Fails over without retrying.
    Policy,
    /// Any other provider-side failure (bad status, malformed response).
    Other,
    /// Every configured provider has failed. Terminal.
    Exhausted,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connection => "connection",
            Self::Policy => "policy",
            Self::Other => "provider",
            Self::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}

/// Error returned by a generation provider or by the failover client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}: {kind} error: {message}")]
pub struct ProviderError {
    /// Provider that produced the error.
    pub provider: String,
    /// Error classification.
    pub kind: ProviderErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ProviderError {
    /// Creates an error of the given kind.
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a connection-class error.
    pub fn connection(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Connection, message)
    }

    /// Creates a policy-class error.
    pub fn policy(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Policy, message)
    }

    /// Creates an unclassified provider error.
    pub fn other(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Other, message)
    }

    /// Classifies a reqwest error.
    pub fn from_reqwest(provider: impl Into<String>, err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::connection(provider, err.to_string())
        } else {
            Self::other(provider, err.to_string())
        }
    }

    /// Returns true if retrying the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind == ProviderErrorKind::Connection
    }

    /// Returns true if this is the terminal all-providers-failed outcome.
    pub fn is_exhausted(&self) -> bool {
        self.kind == ProviderErrorKind::Exhausted
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// An LLM-backed text generation provider.
///
/// Implementations must classify their failures: network problems as
/// [`ProviderErrorKind::Connection`], blocked content as
/// [`ProviderErrorKind::Policy`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generates the complete response for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Generates the response as a stream of chunks.
    ///
    /// The default implementation yields the result of [`generate`] as a
    /// single chunk.
    ///
    /// [`generate`]: GenerationProvider::generate
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let text = self.generate(prompt).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }
}

/// Accumulates a chunk stream into one complete text.
///
/// A mid-stream error discards everything received so far.
///
/// # Errors
///
/// Returns the first chunk error.
pub async fn collect_stream(mut stream: TextStream) -> Result<String, ProviderError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}
