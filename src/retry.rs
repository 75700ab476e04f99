//! Bounded retry for idempotent chain calls
//!
//! Transport failures (`BridgeError::Connection`) are retried up to
//! `max_attempts` times. Every other error kind is terminal and returned on
//! the first occurrence, so a rejected transaction or a bad credential is
//! never resubmitted.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::metrics;

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Pause between attempts (zero retries immediately)
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Effective attempt bound; a configured 0 still runs the operation once
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt is allowed after `attempt` (1-indexed) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }
}

/// Execute `operation` with retry logic.
///
/// The closure receives the 1-indexed attempt number. On exhaustion the
/// final error is returned inside [`BridgeError::RetryExhausted`].
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, BridgeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BridgeError>>,
{
    let max_attempts = config.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    kind = %e.kind(),
                    error = %e,
                    "Attempt failed"
                );
                metrics::FAILED_ATTEMPTS
                    .with_label_values(&[label, e.kind().as_str()])
                    .inc();

                if !e.is_retryable() {
                    return Err(e);
                }

                if !config.should_retry(attempt) {
                    return Err(BridgeError::RetryExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }

                if !config.backoff.is_zero() {
                    tokio::time::sleep(config.backoff).await;
                }
            }
        }
    }
}
