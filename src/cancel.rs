//! Cooperative cancellation for remote calls
//!
//! Every remote call takes a [`CancelToken`] and a time limit. Cancelling the
//! token makes any in-flight [`CancelToken::bounded`] call return
//! [`Error::Cancelled`] at its next await point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::{Error, Result};

/// Shared cancellation flag
///
/// Clones observe the same flag. Cancellation is one-way.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation of all operations observing this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender lives as long as self, so this is unreachable in practice
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` bounded by `limit` and by this token
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if the token fires first, a transport error
    /// naming `what` if `limit` elapses, otherwise whatever `fut` returns
    pub async fn bounded<T, F>(&self, what: &str, limit: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancelled() => {
                tracing::debug!(what, "cancelled");
                Err(Error::Cancelled)
            }
            outcome = tokio::time::timeout(limit, fut) => {
                outcome.map_err(|_| Error::timed_out(what, limit))?
            }
        }
    }
}
