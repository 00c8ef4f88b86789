//! Retry schedule for connection-class failures.

use std::time::Duration;

/// Strategy for retrying failed provider calls.
///
/// `max_retries` counts retries after the first attempt, so a call makes at
/// most `max_retries + 1` attempts. The wait before retry `n` (1-indexed) is
/// `backoff_base^n` seconds. Only the attempt count bounds the schedule; there
/// is no wall-clock cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryStrategy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_base: f64,
}

impl RetryStrategy {
    /// Creates a new retry strategy.
    ///
    /// Negative or NaN bases are clamped to zero (retry immediately).
    pub fn new(max_retries: u32, backoff_base: f64) -> Self {
        Self {
            max_retries,
            backoff_base: backoff_base.max(0.0),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0, 0.0)
    }

    /// Calculates the delay before retry `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.backoff_base.powi(exponent)).unwrap_or(Duration::MAX)
    }

    /// Returns true if retry number `retry` (1-indexed) is still allowed.
    pub fn allows_retry(&self, retry: u32) -> bool {
        retry <= self.max_retries
    }

    /// Total attempts this strategy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3, 2.0)
    }
}
