//! Per-call cancellation and deadlines.
//!
//! A [`CallContext`] travels with every reconciler operation down to the RPC
//! layer. [`CallContext::run`] races the call against the deadline and the
//! cancellation signal so a stuck request never outlives its caller.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Handle used to cancel every call made with the paired context.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel in-flight and future calls.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

/// Cancellation and deadline carried through an operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<(Instant, Duration)>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl CallContext {
    /// A context that never cancels and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Set a deadline `timeout` from now.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now()
            .checked_add(timeout)
            .map(|at| (at, timeout));
        self
    }

    /// Attach a cancellation signal, returning the handle that fires it.
    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_rx = Some(cancel_rx);
        (self, CancelHandle { cancel_tx })
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run `call`, aborting on cancellation or deadline.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or `DeadlineExceeded` if either fires first,
    /// otherwise whatever `call` returns.
    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut cancel_rx = self.cancel_rx.clone();
        let cancelled = async move {
            match cancel_rx.as_mut() {
                Some(rx) => {
                    // A dropped handle can never fire, so wait forever.
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = call => result,
            () = cancelled => Err(Error::Cancelled),
            () = expired => {
                let timeout_ms = deadline
                    .map(|(_, timeout)| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
                    .unwrap_or_default();
                Err(Error::deadline_exceeded(timeout_ms))
            }
        }
    }
}
