//! HTTP transport for the statekeep reconciliation core.
//!
//! Provides:
//! - [`HttpTransport`]: bearer-authenticated client addressing several
//!   named API bases, retrying network errors, 5xx and 429 responses with
//!   exponential backoff
//! - [`TokenBucket`]: optional client-side rate limiting shared across
//!   concurrent reconciliations
//! - [`RequestContext`]: cancellation and deadlines honoured at every wait
//! - [`Envelope`] / [`ListEnvelope`]: the API's JSON response shapes
//!
//! # Example
//!
//! ```no_run
//! use statekeep_transport::{
//!     HttpTransport, Method, RequestContext, Transport, TransportConfig, PRIMARY_BASE,
//! };
//!
//! # async fn run() -> statekeep_transport::TransportResult<()> {
//! let transport = HttpTransport::new(TransportConfig {
//!     token: "secret".to_string(),
//!     base_url: "https://api.example.com".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let ctx = RequestContext::background();
//! let response = transport
//!     .send(&ctx, Method::GET, PRIMARY_BASE, "/api/v2/monitors/1", None)
//!     .await?
//!     .error_for_status()?;
//! let monitor: statekeep_transport::Envelope<serde_json::Value> = response.resource()?;
//! println!("{}", monitor.data.id);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod context;
mod envelope;
mod error;
mod rate_limit;
mod retry;

pub use client::{ApiResponse, HttpTransport, Transport};
pub use config::{
    RateLimitConfig, RetryConfig, TransportConfig, DEFAULT_MAX_ATTEMPTS, PRIMARY_BASE,
};
pub use context::{CancelHandle, RequestContext};
pub use envelope::{Envelope, ListEnvelope, Pagination, Resource};
pub use error::{TransportError, TransportResult};
pub use rate_limit::TokenBucket;
pub use retry::RetryPolicy;

pub use reqwest::{Method, StatusCode};
