//! Bounded retry with fixed or exponential backoff.
//!
//! Only retryable errors (proof rejections, transient oracle / RPC failures)
//! are retried. Precondition violations surface on the first attempt.

use std::{future::Future, time::Duration};

use ghostbridge_types::{BridgeError, Result};

use crate::config::{Backoff, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            backoff: config.backoff,
        }
    }

    /// `max_attempts` tries with no delay between them.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay_ms } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay
                    .saturating_mul(factor)
                    .min(Duration::from_millis(max_delay_ms))
            }
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt ceiling is reached.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    /// The first non-retryable error, or `ProofRetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, label: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        op = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "attempt failed"
                    );
                    if attempt < self.max_attempts {
                        let delay = self.delay_after(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        Err(BridgeError::ProofRetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
