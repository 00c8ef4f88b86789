// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `HotFeed` Fetch
//!
//! Network plumbing shared by sources and generation providers.
//!
//! ## Fetch Contract
//!
//! - [`fetchable::Fetchable`] - The single-method capability every source implements
//! - [`http::HttpClient`] - HTTP client with timeouts, tracing and a domain allowlist
//!
//! ## Generation
//!
//! - [`generation::GenerationProvider`] - Trait for LLM-backed text generation
//! - [`generation::FailoverClient`] - Retry/backoff plus secondary-provider failover
//! - [`generation::OpenAiCompatibleProvider`] - Chat-completions client with SSE streaming
//! - [`retry::RetryStrategy`] - `backoff_base^n` retry schedule
//!
//! ## Example
//!
//! ```ignore
//! use hotfeed_fetch::{FailoverClient, ProviderChain, RetryStrategy};
//!
//! let chain = ProviderChain::new(primary)
//!     .with_secondary(secondary)
//!     .with_retry(RetryStrategy::new(3, 2.0));
//! let client = FailoverClient::new(chain);
//!
//! match client.call("Summarize today's headlines").await {
//!     Ok(text) => println!("{text}"),
//!     Err(e) => eprintln!("generation failed: {e}"),
//! }
//! ```

pub mod error;
pub mod fetchable;
pub mod generation;
pub mod http;
pub mod retry;

pub use error::{FetchError, HttpError};
pub use fetchable::{FetchKind, Fetchable};
pub use generation::{
    CallMode, FailoverClient, GenerationOutcome, GenerationProvider, OpenAiCompatibleProvider,
    OpenAiConfig, ProviderAttempt, ProviderChain, ProviderError, ProviderErrorKind, ProviderRole,
    TextStream, collect_stream,
};
pub use http::HttpClient;
pub use retry::RetryStrategy;
