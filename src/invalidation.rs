//! Invalidation token: tells observers that server state may have changed.
//!
//! The token carries no payload. Flips that happen before an observer has
//! reacted coalesce; observers re-derive everything from the store anyway.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Process-wide "refetch" signal. Clones share the same token.
#[derive(Clone)]
pub struct InvalidationToken {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for InvalidationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Signal that the server state may have changed.
    pub fn flip(&self) {
        self.tx.send_modify(|version| *version = version.wrapping_add(1));
        tracing::debug!("Invalidation token flipped to {}", self.version());
    }

    /// Number of flips so far
    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Raw receiver for observers that drive their own loop. Flips made
    /// before this call are already marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Run `callback` after flips, on a spawned task, until the returned
    /// subscription is cancelled or dropped. Must be called inside a tokio runtime.
    pub fn observe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(u64) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let version = *rx.borrow_and_update();
                callback(version);
            }
        });
        Subscription { handle }
    }
}

/// Handle to an active observer; dropping it stops the observer.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn cancel(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
