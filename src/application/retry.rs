//! Retry policy
//!
//! Capped exponential backoff with jitter, plus a per-call timeout. Only
//! errors that classify themselves as retryable are retried.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::domain::ports::{CdnError, StoreError};

/// Errors the retry loop knows how to classify
pub trait RetryableError: std::error::Error {
    /// Whether repeating the call may succeed.
    fn is_retryable(&self) -> bool;

    /// Error reported when a call exceeds its timeout.
    fn timed_out(after: Duration) -> Self;
}

impl RetryableError for StoreError {
    fn is_retryable(&self) -> bool {
        StoreError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        StoreError::Timeout(after)
    }
}

impl RetryableError for CdnError {
    fn is_retryable(&self) -> bool {
        CdnError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        CdnError::Timeout(after)
    }
}

/// Outcome of a retried call
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub outcome: Result<T, E>,
    /// Calls actually made (at least 1)
    pub attempts: u32,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first call included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for a single delay (before jitter).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% jitter to delays.
    pub add_jitter: bool,
    /// Deadline for a single call.
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
            call_timeout: Duration::from_secs(30),
        }
    }

    /// A policy that makes exactly one call.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            call_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Delay before `attempt` (1-indexed; the first attempt has no delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(2) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.add_jitter && capped > 0.0 {
            let jitter = capped * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(capped + jitter)
        } else {
            Duration::from_secs_f64(capped)
        }
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Each call is bounded by `call_timeout`. A raised `cancel` token stops
    /// further retries (the current call is allowed to finish).
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        subject: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Attempted<T, E>
    where
        E: RetryableError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.call_timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    return Attempted {
                        outcome: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.max_attempts || cancel.is_cancelled() {
                return Attempted {
                    outcome: Err(err),
                    attempts: attempt,
                };
            }

            attempt += 1;
            let delay = self.delay_for_attempt(attempt);
            tracing::warn!(
                operation,
                subject,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient failure"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return Attempted {
                        outcome: Err(err),
                        attempts: attempt - 1,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
