//! Bounded retries with exponential backoff
//!
//! The executor runs any async operation up to a fixed number of attempts.
//! After a failed attempt `n` (1-indexed) it sleeps `base * 2^(n-1)` before
//! the next one, so with the default one-second base the waits are 1s, 2s,
//! 4s, and so on. The last error is returned unchanged.

use crate::config::ScraperConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default backoff base
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Returned when an operation was given zero attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("All retry attempts failed")]
pub struct RetryExhausted;

/// Runs async operations with bounded attempts and exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryExecutor {
    /// Creates an executor with the given default attempts and backoff base
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts,
            backoff_base,
        }
    }

    /// Creates an executor using `retry-attempts` and the default base
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.retry_attempts, DEFAULT_BACKOFF_BASE)
    }

    /// Delay after failed attempt `attempt` (1-indexed)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(31);
        self.backoff_base.saturating_mul(factor)
    }

    /// Runs `operation` with the default number of attempts
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + From<RetryExhausted>,
    {
        self.run_with_attempts(self.max_attempts, operation).await
    }

    /// Runs `operation` up to `max_attempts` times
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful attempt's value
    /// * `Err(E)` - The last attempt's error, or [`RetryExhausted`] converted
    ///   into `E` when `max_attempts` is zero
    pub async fn run_with_attempts<T, E, F, Fut>(
        &self,
        max_attempts: u32,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + From<RetryExhausted>,
    {
        for attempt in 1..=max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(attempt, max_attempts, error = %err, "Attempt failed");

                    if attempt == max_attempts {
                        return Err(err);
                    }

                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
            }
        }

        Err(RetryExhausted.into())
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(3, DEFAULT_BACKOFF_BASE)
    }
}
