//! Debounce filter for rapidly changing input such as the search box.
//!
//! A value handed to `submit` is delivered to subscribers once no further
//! `submit` has happened for the quiescence window. Each `submit` cancels the
//! delivery scheduled by the previous one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default quiescence window for search input
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Default)]
struct PendingDelivery {
    /// Bumped by every submit; a timer only delivers if it still holds the latest value.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Delays propagation of a value until it stops changing.
///
/// Must be used from within a tokio runtime; timers are spawned tasks.
pub struct Debouncer<T> {
    window: Duration,
    pending: Arc<Mutex<PendingDelivery>>,
    delivered: Arc<watch::Sender<T>>,
}

impl<T> Debouncer<T>
where
    T: Send + Sync + 'static,
{
    /// Create a debouncer whose subscribers start out seeing `initial`.
    pub fn new(window: Duration, initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            window,
            pending: Arc::new(Mutex::new(PendingDelivery::default())),
            delivered: Arc::new(tx),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule delivery of `value` one window from now, superseding any
    /// delivery that has not happened yet.
    pub fn submit(&self, value: T) {
        let deadline = Instant::now() + self.window;
        let mut pending = lock(&self.pending);
        pending.generation += 1;
        let generation = pending.generation;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let shared = Arc::clone(&self.pending);
        let delivered = Arc::clone(&self.delivered);
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut pending = lock(&shared);
                if pending.generation != generation {
                    return;
                }
                pending.timer = None;
            }
            delivered.send_replace(value);
        }));
    }

    /// Drop the scheduled delivery, if any.
    pub fn cancel(&self) {
        let mut pending = lock(&self.pending);
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
    }

    /// True while a submitted value is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending).timer.is_some()
    }

    /// Receive every delivered value. The receiver starts at the last delivery.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.delivered.subscribe()
    }
}

impl<T: Clone> Debouncer<T> {
    /// Last delivered value
    pub fn latest(&self) -> T {
        self.delivered.borrow().clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.pending).timer.take() {
            timer.abort();
        }
    }
}

fn lock(pending: &Mutex<PendingDelivery>) -> std::sync::MutexGuard<'_, PendingDelivery> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}
