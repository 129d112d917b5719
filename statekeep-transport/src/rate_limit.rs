//! Client-side token bucket.
//!
//! Shared by every clone of one transport so that many resources
//! converging in the same pass are smoothed into the server's accepted
//! request rate.

use crate::config::RateLimitConfig;
use crate::context::RequestContext;
use crate::error::TransportResult;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    /// May go negative: each waiter reserves its token up front.
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with steady `rate` and capacity `burst`.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket. A non-positive rate or an empty burst is
    /// [`TransportError::Config`](crate::TransportError::Config).
    pub fn new(config: &RateLimitConfig) -> TransportResult<Self> {
        config.validate()?;
        let burst = f64::from(config.burst);
        Ok(Self {
            rate: config.requests_per_second,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Takes one token, waiting for it if the bucket is empty.
    ///
    /// A cancelled wait hands its reservation back.
    pub async fn acquire(&self, ctx: &RequestContext) -> TransportResult<()> {
        ctx.check()?;
        let wait = {
            let mut state = self.state.lock().await;
            self.refill(&mut state);
            state.tokens -= 1.0;
            if state.tokens >= 0.0 {
                return Ok(());
            }
            Duration::from_secs_f64(-state.tokens / self.rate)
        };

        debug!(wait_ms = wait.as_millis() as u64, "rate limiter waiting for token");
        if let Err(e) = ctx.sleep(wait).await {
            let mut state = self.state.lock().await;
            state.tokens = (state.tokens + 1.0).min(self.burst);
            return Err(e);
        }
        Ok(())
    }

    /// Tokens currently available (negative while callers are queued).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_refill = now;
    }
}
