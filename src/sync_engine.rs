//! Synchronization engine: the local working copy of the note collection.
//!
//! The engine owns the current `Snapshot` and replaces it wholesale after
//! every successful `fetch_all`. It never merges or patches: the store is
//! the only source of truth.
//!
//! - Readers get an `Arc<Snapshot>`; replacement swaps the Arc, so a reader
//!   sees either the old or the new collection, never a mix.
//! - A failed fetch keeps the previous snapshot, logs a warning and records
//!   the error in `last_error`. Nothing is retried automatically.
//! - Overlapping fetches are allowed. Each one replaces the snapshot when it
//!   completes, so the most recently completed fetch wins.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::NoteResult;
use crate::gateway::NoteGateway;
use crate::invalidation::InvalidationToken;
use crate::models::Snapshot;
use crate::selection::Selection;

/// Whether a fetch is currently outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
}

/// Outcome of one successful resync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Notes in the new snapshot
    pub notes: usize,
    /// Sequence number of the snapshot this resync installed
    pub generation: u64,
    /// True if the selected note vanished and the selection was cleared
    pub selection_cleared: bool,
}

pub struct SyncEngine<G> {
    gateway: Arc<G>,
    selection: Arc<Selection>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    state: watch::Sender<SyncState>,
    in_flight: AtomicUsize,
    generation: AtomicU64,
    last_error: Mutex<Option<String>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<G> SyncEngine<G>
where
    G: NoteGateway + 'static,
{
    /// Create an engine with an empty snapshot. Nothing is fetched until
    /// `resync` is called or the engine is started.
    pub fn new(gateway: Arc<G>, selection: Arc<Selection>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::empty()));
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            gateway,
            selection,
            snapshot,
            state,
            in_flight: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            last_error: Mutex::new(None),
            driver: Mutex::new(None),
        }
    }

    /// Create an engine, fetch the collection, and resync on every flip of
    /// `token` from then on. Must be called inside a tokio runtime.
    pub fn spawn(gateway: Arc<G>, token: &InvalidationToken, selection: Arc<Selection>) -> Arc<Self> {
        let engine = Arc::new(Self::new(gateway, selection));
        engine.start(token);
        engine
    }

    /// Start the background resync loop: one fetch right away, then one per
    /// observed flip. Flips that arrive while a fetch is running coalesce into
    /// a single follow-up fetch. Restarting replaces the previous loop.
    pub fn start(self: &Arc<Self>, token: &InvalidationToken) {
        let mut flips = token.subscribe();
        let engine = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            if !resync_weak(&engine).await {
                return;
            }
            while flips.changed().await.is_ok() {
                flips.borrow_and_update();
                if !resync_weak(&engine).await {
                    return;
                }
            }
        });

        if let Some(previous) = self.lock_driver().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the background loop. In-flight gateway calls are not cancelled
    /// by the store, but their results are no longer applied by the loop.
    pub fn shutdown(&self) {
        if let Some(handle) = self.lock_driver().take() {
            handle.abort();
        }
    }

    /// Fetch the full collection and replace the snapshot.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned to the caller as well as logged.
    pub async fn resync(&self) -> NoteResult<SyncReport> {
        self.begin_fetch();
        let result = self.gateway.fetch_all().await;
        self.end_fetch();

        match result {
            Ok(notes) => {
                let snapshot = Arc::new(Snapshot::from_notes(notes));
                let count = snapshot.len();
                self.snapshot.send_replace(Arc::clone(&snapshot));
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *self.lock_error() = None;

                let selection_cleared = self.selection.reconcile(&snapshot);
                tracing::debug!("Resync #{} installed {} notes", generation, count);

                Ok(SyncReport {
                    notes: count,
                    generation,
                    selection_cleared,
                })
            }
            Err(e) => {
                tracing::warn!("Resync failed, keeping previous snapshot: {}", e);
                *self.lock_error() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The current complete snapshot
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Be notified of every snapshot replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Number of snapshots installed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Error from the most recent fetch, cleared by the next successful one
    pub fn last_error(&self) -> Option<String> {
        self.lock_error().clone()
    }

    pub fn selection(&self) -> &Arc<Selection> {
        &self.selection
    }

    fn begin_fetch(&self) {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.state.send_replace(SyncState::Fetching);
        }
    }

    fn end_fetch(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.send_replace(SyncState::Idle);
        }
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_driver(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<G> Drop for SyncEngine<G> {
    fn drop(&mut self) {
        let driver = self.driver.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = driver.take() {
            handle.abort();
        }
    }
}

/// Resync through a weak handle. Returns false once the engine is gone.
async fn resync_weak<G: NoteGateway + 'static>(engine: &Weak<SyncEngine<G>>) -> bool {
    let Some(engine) = engine.upgrade() else {
        return false;
    };
    // Failures are already logged and recorded by resync.
    let _ = engine.resync().await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::{GatewayOp, MemoryNoteGateway};
    use crate::models::{Note, NoteId};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn note(id: i64, title: &str) -> Note {
        Note {
            id: NoteId::from(id),
            title: title.to_string(),
            content: String::new(),
            tags: String::new(),
            pinned: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
        }
    }

    fn engine(gateway: &Arc<MemoryNoteGateway>) -> SyncEngine<MemoryNoteGateway> {
        SyncEngine::new(Arc::clone(gateway), Arc::new(Selection::new()))
    }

    #[tokio::test]
    async fn test_starts_empty_and_idle() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a")]));
        let engine = engine(&gateway);

        assert!(engine.current_snapshot().is_empty());
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.generation(), 0);
    }

    #[tokio::test]
    async fn test_resync_replaces_snapshot() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a"), note(2, "b")]));
        let engine = engine(&gateway);

        let before = engine.current_snapshot();
        let report = engine.resync().await.unwrap();
        assert_eq!(report.notes, 2);
        assert_eq!(report.generation, 1);

        // The old Arc is untouched; readers holding it keep a complete view.
        assert!(before.is_empty());
        assert_eq!(engine.current_snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_previous_snapshot() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a")]));
        let engine = engine(&gateway);
        engine.resync().await.unwrap();
        let before = engine.current_snapshot();

        gateway.set_failing(GatewayOp::FetchAll, true);
        let err = engine.resync().await.unwrap_err();
        assert!(err.is_transport());

        assert_eq!(engine.current_snapshot(), before);
        assert_eq!(engine.generation(), 1);
        assert!(engine.last_error().is_some());
        assert_eq!(engine.state(), SyncState::Idle);
        // Reported once, not retried.
        assert_eq!(gateway.calls(GatewayOp::FetchAll), 2);

        gateway.set_failing(GatewayOp::FetchAll, false);
        engine.resync().await.unwrap();
        assert!(engine.last_error().is_none());
    }

    #[tokio::test]
    async fn test_resync_clears_selection_of_deleted_note() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a"), note(2, "b")]));
        let engine = engine(&gateway);
        engine.resync().await.unwrap();

        engine.selection().select(NoteId::from(2));
        gateway.delete(&NoteId::from(2)).await.unwrap();

        let report = engine.resync().await.unwrap();
        assert!(report.selection_cleared);
        assert!(engine.selection().selected().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_engine_fetches_on_start_and_flip() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a")]));
        let token = InvalidationToken::new();
        let engine = SyncEngine::spawn(Arc::clone(&gateway), &token, Arc::new(Selection::new()));
        let mut snapshots = engine.subscribe();

        snapshots.changed().await.unwrap();
        assert_eq!(snapshots.borrow_and_update().len(), 1);

        gateway.insert(note(2, "b"));
        token.flip();
        snapshots.changed().await.unwrap();
        assert_eq!(snapshots.borrow_and_update().len(), 2);
        assert_eq!(gateway.calls(GatewayOp::FetchAll), 2);

        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_flips_during_fetch_coalesce() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a")]));
        gateway.push_fetch_delay(Duration::from_millis(100));
        let token = InvalidationToken::new();
        let engine = SyncEngine::spawn(Arc::clone(&gateway), &token, Arc::new(Selection::new()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.state(), SyncState::Fetching);
        token.flip();
        token.flip();
        token.flip();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.state(), SyncState::Idle);
        // Initial fetch plus one follow-up for the three flips.
        assert_eq!(gateway.calls(GatewayOp::FetchAll), 2);
        assert_eq!(engine.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_most_recently_completed_fetch_wins() {
        let gateway = Arc::new(MemoryNoteGateway::with_notes(vec![note(1, "a")]));
        let engine = Arc::new(engine(&gateway));

        // Slow fetch sees one note; a later, faster fetch sees two.
        gateway.push_fetch_delay(Duration::from_millis(200));
        let slow = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.resync().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        gateway.insert(note(2, "b"));
        gateway.push_fetch_delay(Duration::from_millis(50));
        engine.resync().await.unwrap();
        assert_eq!(engine.current_snapshot().len(), 2);
        assert_eq!(engine.state(), SyncState::Fetching);

        slow.await.unwrap().unwrap();
        assert_eq!(engine.current_snapshot().len(), 1);
        assert_eq!(engine.generation(), 2);
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_dropping_engine_stops_loop() {
        let gateway = Arc::new(MemoryNoteGateway::new());
        let token = InvalidationToken::new();
        let engine = SyncEngine::spawn(Arc::clone(&gateway), &token, Arc::new(Selection::new()));
        let mut snapshots = engine.subscribe();
        snapshots.changed().await.unwrap();
        drop(engine);

        token.flip();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(gateway.calls(GatewayOp::FetchAll), 1);
    }
}
