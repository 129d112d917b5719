//! Transport configuration.

use crate::error::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the primary API base.
pub const PRIMARY_BASE: &str = "primary";

/// Attempt count used when none (or an invalid one) is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Configuration consumed by [`HttpTransport`](crate::HttpTransport).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Bearer credential sent with every request.
    pub token: String,
    /// Optional `User-Agent` header value.
    pub user_agent: Option<String>,
    /// URL of the primary base (`PRIMARY_BASE`).
    pub base_url: String,
    /// Additional named bases, e.g. satellite endpoints of adjacent products.
    pub alternate_urls: BTreeMap<String, String>,
    /// When set, every base resolves to this URL (tests, alternate environments).
    pub override_url: Option<String>,
    pub retry: RetryConfig,
    /// Client-side throttling; disabled when `None`.
    pub rate_limit: Option<RateLimitConfig>,
    /// Per-attempt HTTP timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            user_agent: None,
            base_url: String::new(),
            alternate_urls: BTreeMap::new(),
            override_url: None,
            retry: RetryConfig::default(),
            rate_limit: None,
            timeout_secs: 60,
        }
    }
}

// The token never ends up in logs.
impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .field("alternate_urls", &self.alternate_urls)
            .field("override_url", &self.override_url)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TransportConfig {
    /// Resolves a base key to its URL, without a trailing slash.
    pub fn base(&self, key: &str) -> TransportResult<&str> {
        if let Some(url) = &self.override_url {
            return Ok(url.trim_end_matches('/'));
        }
        let url = if key == PRIMARY_BASE {
            Some(self.base_url.as_str())
        } else {
            self.alternate_urls.get(key).map(String::as_str)
        };
        url.filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/'))
            .ok_or_else(|| TransportError::UnknownBase(key.to_string()))
    }

    pub(crate) fn validate(&self) -> TransportResult<()> {
        if self.token.is_empty() {
            return Err(TransportError::Config("API token is empty".to_string()));
        }
        if self.override_url.is_none() && self.base_url.is_empty() {
            return Err(TransportError::Config("base URL is empty".to_string()));
        }
        if self.retry.min_wait_ms > self.retry.max_wait_ms {
            return Err(TransportError::Config(format!(
                "retry min wait {}ms exceeds max wait {}ms",
                self.retry.min_wait_ms, self.retry.max_wait_ms
            )));
        }
        if let Some(limit) = &self.rate_limit {
            limit.validate()?;
        }
        Ok(())
    }
}

/// Retry bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one. Values outside
    /// `1..=DEFAULT_MAX_ATTEMPTS` fall back to the default.
    pub max_attempts: i64,
    /// Backoff before the second attempt (milliseconds).
    pub min_wait_ms: u64,
    /// Upper bound of any single backoff (milliseconds).
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: i64::from(DEFAULT_MAX_ATTEMPTS),
            min_wait_ms: 1_000,
            max_wait_ms: 30_000,
        }
    }
}

/// Token-bucket parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Steady refill rate.
    pub requests_per_second: f64,
    /// Bucket capacity.
    pub burst: u32,
}

impl RateLimitConfig {
    pub(crate) fn validate(&self) -> TransportResult<()> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(TransportError::Config(format!(
                "rate limit must be positive, got {}",
                self.requests_per_second
            )));
        }
        if self.burst == 0 {
            return Err(TransportError::Config("rate limit burst must be at least 1".to_string()));
        }
        Ok(())
    }
}
