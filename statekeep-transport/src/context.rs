//! Caller-supplied cancellation and deadlines.
//!
//! Every suspension point of a reconciliation (HTTP round trip, backoff
//! sleep, rate-limiter wait) races against the [`RequestContext`] and
//! returns [`TransportError::Cancelled`] or
//! [`TransportError::DeadlineExceeded`] as soon as it fires.

use crate::error::{TransportError, TransportResult};
use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cancels every [`RequestContext`] derived from it.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Cancellation signal and optional deadline for one reconciliation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never cancels.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that can be cancelled through the returned handle.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle(Arc::new(tx)))
    }

    /// Adds a deadline `timeout` from now. An earlier deadline is kept.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the error the context has already ended with, if any.
    pub fn check(&self) -> TransportResult<()> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(TransportError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TransportError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context ends first.
    pub async fn run<F: Future>(&self, fut: F) -> TransportResult<F::Output> {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration`, waking early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> TransportResult<()> {
        self.run(tokio::time::sleep(duration)).await
    }

    /// Resolves once the context is cancelled or past its deadline.
    async fn done(&self) -> TransportError {
        let cancelled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        if *rx.borrow_and_update() {
                            return;
                        }
                        if rx.changed().await.is_err() {
                            // Handle dropped without cancelling.
                            pending::<()>().await;
                        }
                    }
                }
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            () = cancelled => TransportError::Cancelled,
            () = expired => TransportError::DeadlineExceeded,
        }
    }
}
