//! Retry policy with exponential backoff.
//!
//! Network errors, 5xx and 429 responses are retried. Every other status
//! is handed back to the caller on the first attempt.

use crate::config::{RetryConfig, DEFAULT_MAX_ATTEMPTS};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// Resolved retry bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy, clamping an out-of-range attempt count to the default.
    pub fn from_config(config: &RetryConfig) -> Self {
        let max_attempts = u32::try_from(config.max_attempts)
            .ok()
            .filter(|n| (1..=DEFAULT_MAX_ATTEMPTS).contains(n))
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        Self {
            max_attempts,
            min_wait: Duration::from_millis(config.min_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if a response with `status` should be retried.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Backoff after failed attempt number `attempt` (1-based):
    /// `min_wait * 2^(attempt-1)`, capped at `max_wait`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.min_wait
            .saturating_mul(1_u32 << exponent)
            .min(self.max_wait)
    }

    /// Wait before the next attempt. A server-provided `Retry-After`
    /// replaces the computed backoff, still capped at `max_wait`.
    pub fn wait(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.max_wait),
            None => self.backoff(attempt),
        }
    }

    /// Reads a `Retry-After: <seconds>` header from 429/503 responses.
    /// HTTP-date values are ignored.
    pub fn retry_after(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
            return None;
        }
        headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}
