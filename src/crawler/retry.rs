//! Bounded retry with randomized backoff
//!
//! [`RetryPolicy::run`] wraps any fallible async operation. Between attempts
//! it sleeps a uniformly random duration drawn from a jitter window. Challenge
//! errors draw from their own window, which defaults to the regular one so
//! that a challenge is retried exactly like a transport failure unless
//! configured otherwise.

use crate::config::{CrawlerConfig, JitterWindow};
use crate::HarvestError;
use std::future::Future;

/// Attempt ceiling plus the backoff windows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff after a transport or page-load failure
    pub backoff: JitterWindow,

    /// Backoff after a challenge page
    pub challenge_backoff: JitterWindow,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: JitterWindow) -> Self {
        Self {
            max_attempts,
            backoff,
            challenge_backoff: backoff,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config.retry_backoff,
            challenge_backoff: config.effective_challenge_backoff(),
        }
    }

    pub fn with_challenge_backoff(mut self, window: JitterWindow) -> Self {
        self.challenge_backoff = window;
        self
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the attempt ceiling; the last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, HarvestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let window = if err.is_challenge() {
                self.challenge_backoff
            } else {
                self.backoff
            };
            let delay = window.sample();

            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retry {}/{} for {} in {:.1}s",
                attempt,
                max_attempts,
                label,
                delay.as_secs_f64()
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
