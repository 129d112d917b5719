//! Transport error types.

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to the API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network failure (connect, timeout, reset) that outlived the retry budget.
    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    Network {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response the caller chose to treat as fatal.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    /// Response body did not have the expected shape. Never retried.
    #[error("failed to decode response of {method} {path}: {source}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("unknown API base {0:?}")]
    UnknownBase(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    /// Returns true if the caller's context ended the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled | TransportError::DeadlineExceeded)
    }

    /// Returns the HTTP status for protocol errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error represents a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
