//! HTTP transport.
//!
//! One [`HttpTransport`] carries the client identity (token, user agent)
//! and can address several API bases. Clones share the connection pool
//! and the rate limiter.

use crate::config::TransportConfig;
use crate::context::RequestContext;
use crate::envelope::{Envelope, ListEnvelope};
use crate::error::{TransportError, TransportResult};
use crate::rate_limit::TokenBucket;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A fully-read API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns a non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self) -> TransportResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(TransportError::Status {
            body: self.text(),
            method: self.method,
            path: self.path,
            status: self.status,
        })
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| TransportError::Decode {
            method: self.method.clone(),
            path: self.path.clone(),
            source,
        })
    }

    /// Decodes a single-resource envelope.
    pub fn resource<T: DeserializeOwned>(&self) -> TransportResult<Envelope<T>> {
        self.json()
    }

    /// Decodes a list envelope.
    pub fn list<T: DeserializeOwned>(&self) -> TransportResult<ListEnvelope<T>> {
        self.json()
    }
}

/// Something that can send API requests.
///
/// `base` selects one of the configured API bases; `path` starts with `/`
/// and may carry a query string.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        base: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> TransportResult<ApiResponse>;
}

/// Authenticated, retrying, optionally throttled HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: Arc<TransportConfig>,
    client: Client,
    retry: RetryPolicy,
    limiter: Option<Arc<TokenBucket>>,
}

impl HttpTransport {
    /// Validates `config` and builds the client.
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Config(format!("failed to create HTTP client: {e}")))?;
        let retry = RetryPolicy::from_config(&config.retry);
        let limiter = config
            .rate_limit
            .as_ref()
            .map(|c| TokenBucket::new(c).map(Arc::new))
            .transpose()?;

        Ok(Self {
            config: Arc::new(config),
            client,
            retry,
            limiter,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Issues one attempt and reads the body in full.
    async fn attempt(
        &self,
        ctx: &RequestContext,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> TransportResult<Result<(StatusCode, Option<Duration>, Vec<u8>), reqwest::Error>> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.config.token);
        if let Some(agent) = &self.config.user_agent {
            request = request.header(USER_AGENT, agent);
        }
        if *method == Method::POST || *method == Method::PATCH {
            request = request.header(CONTENT_TYPE, "application/json");
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = match ctx.run(request.send()).await? {
            Ok(response) => response,
            Err(e) => return Ok(Err(e)),
        };
        let status = response.status();
        let retry_after = RetryPolicy::retry_after(status, response.headers());
        // Reading the body to the end returns the connection to the pool.
        Ok(ctx
            .run(response.bytes())
            .await?
            .map(|bytes| (status, retry_after, bytes.to_vec())))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        base: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> TransportResult<ApiResponse> {
        let url = format!("{}{}", self.config.base(base)?, path);
        let body = body.map(|b| serde_json::to_vec(&b)).transpose()?;
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if let Some(limiter) = &self.limiter {
                limiter.acquire(ctx).await?;
            }
            debug!(%method, %url, attempt, "sending request");

            let wait = match self.attempt(ctx, &method, &url, body.as_deref()).await? {
                Ok((status, retry_after, bytes)) => {
                    if !RetryPolicy::is_retryable_status(status) || attempt >= max_attempts {
                        debug!(%method, %url, %status, attempt, "request complete");
                        return Ok(ApiResponse {
                            method,
                            path: path.to_string(),
                            status,
                            body: bytes,
                        });
                    }
                    let wait = self.retry.wait(attempt, retry_after);
                    warn!(
                        %method, %url, %status, attempt, max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        "retryable response, backing off"
                    );
                    wait
                }
                Err(source) => {
                    if attempt >= max_attempts {
                        return Err(TransportError::Network {
                            method,
                            url,
                            attempts: attempt,
                            source,
                        });
                    }
                    let wait = self.retry.backoff(attempt);
                    warn!(
                        %method, %url, attempt, max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %source,
                        "request failed, backing off"
                    );
                    wait
                }
            };
            ctx.sleep(wait).await?;
        }
    }
}
