//! Provider failover client.
//!
//! Per call:
//!
//! ```text
//! TryPrimary ──ok──────────────────────────▶ Done
//!     │ connection error, retries left: sleep(base^n), retry
//!     │ policy/other error, or retries spent
//!     ▼
//! TrySecondary ──ok────────────────────────▶ Done
//!     │ (same retry rule)
//!     ▼
//! Exhausted
//! ```
//!
//! The chain is immutable once the client is built and a call keeps no
//! state beyond its own attempt log.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{GenerationProvider, ProviderError, ProviderErrorKind, collect_stream};
use crate::retry::RetryStrategy;

/// Default per-attempt timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Provider Chain
// ============================================================================

/// Position of a provider in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    /// Tried first.
    Primary,
    /// Tried after the primary fails.
    Secondary,
}

impl ProviderRole {
    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// An ordered pair of providers plus the retry schedule.
#[derive(Clone)]
pub struct ProviderChain {
    primary: Arc<dyn GenerationProvider>,
    secondary: Option<Arc<dyn GenerationProvider>>,
    retry: RetryStrategy,
}

impl ProviderChain {
    /// Creates a chain with only a primary provider.
    pub fn new(primary: Arc<dyn GenerationProvider>) -> Self {
        Self {
            primary,
            secondary: None,
            retry: RetryStrategy::default(),
        }
    }

    /// Sets the secondary provider.
    pub fn with_secondary(mut self, secondary: Arc<dyn GenerationProvider>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Sets the retry schedule.
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the primary provider.
    pub fn primary(&self) -> &Arc<dyn GenerationProvider> {
        &self.primary
    }

    /// Returns the secondary provider, if configured.
    pub fn secondary(&self) -> Option<&Arc<dyn GenerationProvider>> {
        self.secondary.as_ref()
    }

    /// Returns the retry schedule.
    pub fn retry(&self) -> RetryStrategy {
        self.retry
    }

    fn providers(&self) -> impl Iterator<Item = (ProviderRole, &Arc<dyn GenerationProvider>)> {
        std::iter::once((ProviderRole::Primary, &self.primary))
            .chain(self.secondary.iter().map(|s| (ProviderRole::Secondary, s)))
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.as_ref().map(|s| s.name()))
            .field("retry", &self.retry)
            .finish()
    }
}

// ============================================================================
// Attempts & Outcome
// ============================================================================

/// How the provider is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallMode {
    /// One request, one complete response.
    #[default]
    Blocking,
    /// Incremental chunks accumulated into one response.
    Streaming,
}

/// Record of a single provider attempt.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    /// Provider name.
    pub provider: String,
    /// Position in the chain.
    pub role: ProviderRole,
    /// Attempt number against this provider (1-indexed).
    pub attempt: u32,
    /// Error if the attempt failed.
    pub error: Option<ProviderError>,
    /// Backoff slept after this attempt before the next one.
    pub backoff: Option<Duration>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl ProviderAttempt {
    /// Returns true if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The outcome of a failover call.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The text or the terminal error.
    pub result: Result<String, ProviderError>,
    /// All attempts made, in order.
    pub attempts: Vec<ProviderAttempt>,
    /// Total duration including backoff sleeps.
    pub duration: Duration,
}

impl GenerationOutcome {
    /// Returns true if the call produced text.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the number of attempts made.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the number of attempts made against one role.
    pub fn attempts_for(&self, role: ProviderRole) -> usize {
        self.attempts.iter().filter(|a| a.role == role).count()
    }

    /// Returns true if the secondary provider was tried.
    pub fn failed_over(&self) -> bool {
        self.attempts_for(ProviderRole::Secondary) > 0
    }

    /// Returns the name of the provider that produced the text.
    pub fn successful_provider(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.is_success())
            .map(|a| a.provider.as_str())
    }
}

// ============================================================================
// Failover Client
// ============================================================================

/// Generation client with retry on connection errors and failover to a
/// secondary provider.
///
/// With no secondary configured this is the plain retrying client: a
/// connection error is retried with backoff, anything else fails the call.
#[derive(Debug, Clone)]
pub struct FailoverClient {
    chain: ProviderChain,
    call_timeout: Duration,
}

impl FailoverClient {
    /// Creates a client for the given chain.
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Creates a single-provider retrying client.
    pub fn retrying(provider: Arc<dyn GenerationProvider>, retry: RetryStrategy) -> Self {
        Self::new(ProviderChain::new(provider).with_retry(retry))
    }

    /// Sets the per-attempt timeout. A timed-out attempt is a connection error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Returns the provider chain.
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Generates text, failing over as needed.
    ///
    /// `Ok("")` is a valid empty response.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Exhausted`] error once every provider
    /// has failed.
    pub async fn call(&self, prompt: &str) -> Result<String, ProviderError> {
        self.execute(prompt, CallMode::Blocking).await.result
    }

    /// Like [`call`](Self::call), but reads the provider's stream and only
    /// decides success once the stream has completed.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Exhausted`] error once every provider
    /// has failed.
    pub async fn call_streaming(&self, prompt: &str) -> Result<String, ProviderError> {
        self.execute(prompt, CallMode::Streaming).await.result
    }

    /// Runs the failover state machine and returns the full attempt log.
    #[instrument(skip(self, prompt), fields(primary = %self.chain.primary.name()))]
    pub async fn execute(&self, prompt: &str, mode: CallMode) -> GenerationOutcome {
        let start = Instant::now();
        let mut attempts = Vec::new();
        let mut last_error: Option<ProviderError> = None;

        for (role, provider) in self.chain.providers() {
            if let Some(ref previous) = last_error {
                warn!(
                    from = %previous.provider,
                    to = %provider.name(),
                    error = %previous,
                    "Failing over to secondary provider"
                );
            }

            match self
                .run_provider(provider.as_ref(), role, prompt, mode, &mut attempts)
                .await
            {
                Ok(text) => {
                    info!(
                        provider = %provider.name(),
                        attempts = attempts.len(),
                        chars = text.chars().count(),
                        "Generation succeeded"
                    );
                    return GenerationOutcome {
                        result: Ok(text),
                        attempts,
                        duration: start.elapsed(),
                    };
                }
                Err(error) => last_error = Some(error),
            }
        }

        let detail = last_error.map_or_else(|| "no providers".to_string(), |e| e.to_string());
        warn!(attempts = attempts.len(), error = %detail, "All providers failed");

        GenerationOutcome {
            result: Err(ProviderError::new(
                self.chain.primary.name(),
                ProviderErrorKind::Exhausted,
                format!("all providers failed after {} attempts; last: {detail}", attempts.len()),
            )),
            attempts,
            duration: start.elapsed(),
        }
    }

    /// Attempts one provider, retrying connection errors with backoff.
    async fn run_provider(
        &self,
        provider: &dyn GenerationProvider,
        role: ProviderRole,
        prompt: &str,
        mode: CallMode,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Result<String, ProviderError> {
        let retry = self.chain.retry;
        let mut attempt = 1u32;

        loop {
            let attempt_start = Instant::now();
            debug!(provider = %provider.name(), attempt, "Calling provider");

            let result = self.attempt_once(provider, prompt, mode).await;
            let duration = attempt_start.elapsed();

            match result {
                Ok(text) => {
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        role,
                        attempt,
                        error: None,
                        backoff: None,
                        duration,
                    });
                    return Ok(text);
                }
                Err(error) => {
                    let backoff = (error.is_retryable() && retry.allows_retry(attempt))
                        .then(|| retry.delay_for_attempt(attempt));

                    warn!(
                        provider = %provider.name(),
                        attempt,
                        kind = %error.kind,
                        error = %error.message,
                        duration = ?duration,
                        "Provider attempt failed"
                    );

                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        role,
                        attempt,
                        error: Some(error.clone()),
                        backoff,
                        duration,
                    });

                    let Some(delay) = backoff else {
                        return Err(error);
                    };

                    info!(
                        provider = %provider.name(),
                        retry = attempt,
                        delay = ?delay,
                        "Connection error, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt_once(
        &self,
        provider: &dyn GenerationProvider,
        prompt: &str,
        mode: CallMode,
    ) -> Result<String, ProviderError> {
        let call = async {
            match mode {
                CallMode::Blocking => provider.generate(prompt).await,
                CallMode::Streaming => {
                    collect_stream(provider.generate_stream(prompt).await?).await
                }
            }
        };

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::connection(
                provider.name(),
                format!("timed out after {:?}", self.call_timeout),
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TextStream;
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that replays a script of results, then repeats the fallback.
    struct ScriptedProvider {
        name: String,
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        fallback: Result<String, ProviderError>,
        calls: AtomicUsize,
        call_times: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedProvider {
        fn new(name: &str, fallback: Result<String, ProviderError>) -> Self {
            Self {
                name: name.to_string(),
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn then(self, result: Result<String, ProviderError>) -> Self {
            self.script.lock().unwrap().push_back(result);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(tokio::time::Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.next()
        }
    }

    /// Provider whose stream yields scripted chunks.
    struct ChunkedProvider {
        chunks: Vec<Result<String, ProviderError>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationProvider for ChunkedProvider {
        fn name(&self) -> &str {
            "chunked"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::other("chunked", "blocking mode not supported"))
        }

        async fn generate_stream(&self, _prompt: &str) -> Result<TextStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(stream::iter(self.chunks.clone()).boxed())
        }
    }

    /// Provider that never answers.
    struct HangingProvider;

    #[async_trait]
    impl GenerationProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            futures::future::pending().await
        }
    }

    fn ok(text: &str) -> Result<String, ProviderError> {
        Ok(text.to_string())
    }

    fn conn(name: &str) -> Result<String, ProviderError> {
        Err(ProviderError::connection(name, "connection refused"))
    }

    fn blocked(name: &str) -> Result<String, ProviderError> {
        Err(ProviderError::policy(name, "content blocked"))
    }

    #[tokio::test]
    async fn test_primary_success() {
        let primary = Arc::new(ScriptedProvider::new("primary", ok("hello")));
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("unused")));
        let client = FailoverClient::new(
            ProviderChain::new(primary.clone()).with_secondary(secondary.clone()),
        );

        let outcome = client.execute("p", CallMode::Blocking).await;
        assert_eq!(outcome.result.as_ref().unwrap(), "hello");
        assert_eq!(outcome.attempts_count(), 1);
        assert!(!outcome.failed_over());
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_policy_error_fails_over_without_retry() {
        let primary = Arc::new(ScriptedProvider::new("primary", blocked("primary")));
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("fallback text")));
        let client = FailoverClient::new(
            ProviderChain::new(primary.clone())
                .with_secondary(secondary.clone())
                .with_retry(RetryStrategy::new(5, 2.0)),
        );

        let outcome = client.execute("p", CallMode::Blocking).await;
        assert_eq!(outcome.result.as_deref(), Ok("fallback text"));
        assert_eq!(primary.calls(), 1, "no retries against the primary");
        assert_eq!(secondary.calls(), 1);
        assert_eq!(outcome.successful_provider(), Some("secondary"));
        assert!(outcome.failed_over());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_matches_base_power() {
        let primary = Arc::new(
            ScriptedProvider::new("primary", ok("finally"))
                .then(conn("primary"))
                .then(conn("primary"))
                .then(conn("primary")),
        );
        let client = FailoverClient::retrying(primary.clone(), RetryStrategy::new(3, 2.0));

        let outcome = client.execute("p", CallMode::Blocking).await;
        assert_eq!(outcome.result.as_deref(), Ok("finally"));
        assert_eq!(primary.calls(), 4);

        let times = primary.call_times.lock().unwrap().clone();
        let tolerance = Duration::from_millis(50);
        for (n, pair) in times.windows(2).enumerate() {
            let expected = Duration::from_secs(2u64.pow(u32::try_from(n).unwrap() + 1));
            let waited = pair[1] - pair[0];
            assert!(
                waited >= expected && waited < expected + tolerance,
                "wait before retry {} was {waited:?}, expected {expected:?}",
                n + 1
            );
        }

        let backoffs: Vec<_> = outcome.attempts.iter().map(|a| a.backoff).collect();
        assert_eq!(
            backoffs,
            vec![
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(8)),
                None
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_without_secondary() {
        let primary = Arc::new(ScriptedProvider::new("primary", conn("primary")));
        let client = FailoverClient::retrying(primary.clone(), RetryStrategy::new(2, 1.0));

        let err = client.call("p").await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(primary.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_retries_then_failover() {
        let primary = Arc::new(ScriptedProvider::new("primary", conn("primary")));
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("from secondary")));
        let client = FailoverClient::new(
            ProviderChain::new(primary.clone())
                .with_secondary(secondary.clone())
                .with_retry(RetryStrategy::new(2, 2.0)),
        );

        let outcome = client.execute("p", CallMode::Blocking).await;
        assert_eq!(outcome.result.as_deref(), Ok("from secondary"));
        assert_eq!(outcome.attempts_for(ProviderRole::Primary), 3);
        assert_eq!(outcome.attempts_for(ProviderRole::Secondary), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_without_secondary_fails_once() {
        let primary = Arc::new(ScriptedProvider::new("primary", blocked("primary")));
        let client = FailoverClient::retrying(primary.clone(), RetryStrategy::new(3, 2.0));

        let err = client.call("p").await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Exhausted);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_fail_is_exhausted_not_empty() {
        let primary = Arc::new(ScriptedProvider::new("primary", blocked("primary")));
        let secondary = Arc::new(ScriptedProvider::new(
            "secondary",
            Err(ProviderError::other("secondary", "HTTP 500")),
        ));
        let client = FailoverClient::new(
            ProviderChain::new(primary).with_secondary(secondary),
        );

        let outcome = client.execute("p", CallMode::Blocking).await;
        let err = outcome.result.as_ref().unwrap_err();
        assert!(err.is_exhausted());
        assert!(err.message.contains("HTTP 500"));
        assert_eq!(outcome.attempts_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_is_success() {
        let primary = Arc::new(ScriptedProvider::new("primary", ok("")));
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("unused")));
        let client = FailoverClient::new(
            ProviderChain::new(primary).with_secondary(secondary.clone()),
        );

        assert_eq!(client.call("p").await.unwrap(), "");
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_streaming_accumulates_chunks() {
        let primary = Arc::new(ChunkedProvider {
            chunks: vec![ok("Hot "), ok("topics "), ok("today")],
            calls: AtomicUsize::new(0),
        });
        let client = FailoverClient::retrying(primary, RetryStrategy::no_retry());

        assert_eq!(client.call_streaming("p").await.unwrap(), "Hot topics today");
    }

    #[tokio::test]
    async fn test_streaming_multibyte_text_is_intact() {
        let primary = Arc::new(ChunkedProvider {
            chunks: vec![ok("今日"), ok("热搜")],
            calls: AtomicUsize::new(0),
        });
        let client = FailoverClient::retrying(primary, RetryStrategy::no_retry());

        let text = client.call_streaming("p").await.unwrap();
        assert_eq!(text, "今日热搜");
        assert_eq!(text.chars().count(), 4);
    }

    #[tokio::test]
    async fn test_streaming_partial_failure_fails_over() {
        let primary = Arc::new(ChunkedProvider {
            chunks: vec![ok("partial "), blocked("chunked")],
            calls: AtomicUsize::new(0),
        });
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("complete answer")));
        let client = FailoverClient::new(
            ProviderChain::new(primary.clone()).with_secondary(secondary),
        );

        let text = client.call_streaming("p").await.unwrap();
        assert_eq!(text, "complete answer");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_connection_class() {
        let secondary = Arc::new(ScriptedProvider::new("secondary", ok("rescued")));
        let client = FailoverClient::new(
            ProviderChain::new(Arc::new(HangingProvider))
                .with_secondary(secondary)
                .with_retry(RetryStrategy::new(1, 1.0)),
        )
        .with_timeout(Duration::from_secs(5));

        let outcome = client.execute("p", CallMode::Blocking).await;
        assert_eq!(outcome.result.as_deref(), Ok("rescued"));
        assert_eq!(outcome.attempts_for(ProviderRole::Primary), 2);
        let first = outcome.attempts[0].error.as_ref().unwrap();
        assert_eq!(first.kind, ProviderErrorKind::Connection);
    }

    #[test]
    fn test_chain_debug_names_providers() {
        let chain = ProviderChain::new(Arc::new(HangingProvider));
        let debug = format!("{chain:?}");
        assert!(debug.contains("hanging"));
        assert!(chain.secondary().is_none());
    }
}
