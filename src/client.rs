//! Client facade wiring the gateway, synchronization engine, search debounce,
//! selection and mutation coordinator together.
//!
//! ```ignore
//! let client = NotesClient::from_config(&Config::new(None)?)?;
//! let mut composer = client.composer();
//! client.search("work");
//! while let Some(notes) = composer.changed().await {
//!     render(&notes);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::NoteResult;
use crate::export::ExportDocument;
use crate::gateway::NoteGateway;
use crate::http_gateway::HttpNoteGateway;
use crate::invalidation::InvalidationToken;
use crate::models::{Note, NoteDraft, NoteId, Snapshot};
use crate::mutation::MutationCoordinator;
use crate::selection::Selection;
use crate::sync_engine::{SyncEngine, SyncReport, SyncState};
use crate::view::{view, ViewComposer};

pub struct NotesClient<G: NoteGateway + 'static> {
    token: InvalidationToken,
    selection: Arc<Selection>,
    engine: Arc<SyncEngine<G>>,
    search: Debouncer<String>,
    mutations: MutationCoordinator<G>,
}

impl NotesClient<HttpNoteGateway> {
    /// Build a client against the store named in `config`, using the stored
    /// session token. Must be called inside a tokio runtime.
    pub fn from_config(config: &Config) -> NoteResult<Self> {
        let gateway = HttpNoteGateway::from_config(config)?;
        Ok(Self::start(Arc::new(gateway), config.search_debounce()))
    }
}

impl<G: NoteGateway + 'static> NotesClient<G> {
    /// Wire everything up and kick off the initial fetch.
    /// Must be called inside a tokio runtime.
    pub fn start(gateway: Arc<G>, search_window: Duration) -> Self {
        let token = InvalidationToken::new();
        let selection = Arc::new(Selection::new());
        let engine = SyncEngine::spawn(Arc::clone(&gateway), &token, Arc::clone(&selection));
        let mutations =
            MutationCoordinator::new(Arc::clone(&gateway), token.clone(), Arc::clone(&selection));

        Self {
            token,
            selection,
            engine,
            search: Debouncer::new(search_window, String::new()),
            mutations,
        }
    }

    /// Feed a keystroke's worth of search text. The view follows once typing
    /// pauses for the debounce window.
    pub fn search(&self, query: impl Into<String>) {
        self.search.submit(query.into());
    }

    /// The query the view is currently filtered by
    pub fn active_query(&self) -> String {
        self.search.latest()
    }

    /// Filtered, ordered notes for the current snapshot and active query
    pub fn view(&self) -> Vec<Note> {
        view(&self.engine.current_snapshot(), &self.search.latest())
    }

    /// A composer that yields a fresh view whenever the snapshot or the
    /// debounced query changes
    pub fn composer(&self) -> ViewComposer {
        ViewComposer::new(self.engine.subscribe(), self.search.subscribe())
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.engine.current_snapshot()
    }

    pub fn sync_state(&self) -> SyncState {
        self.engine.state()
    }

    /// Error from the last background resync, if it failed
    pub fn last_sync_error(&self) -> Option<String> {
        self.engine.last_error()
    }

    /// Resync now. Failures are returned, never retried.
    pub async fn refresh(&self) -> NoteResult<SyncReport> {
        self.engine.resync().await
    }

    pub fn select(&self, id: NoteId) {
        self.selection.select(id);
    }

    pub fn clear_selection(&self) {
        self.selection.clear();
    }

    /// The note open for editing, as it appears in the current snapshot.
    /// None if nothing is selected or the note has gone away.
    pub fn selected_note(&self) -> Option<Note> {
        self.selection.selected_note(&self.engine.current_snapshot())
    }

    pub async fn create(&self, draft: NoteDraft) -> NoteResult<Option<Note>> {
        self.mutations.create(draft).await
    }

    pub async fn update(&self, id: &NoteId, draft: NoteDraft) -> NoteResult<Option<Note>> {
        self.mutations.update(id, draft).await
    }

    pub async fn delete<F>(&self, id: &NoteId, confirm: F) -> NoteResult<bool>
    where
        F: FnOnce(&NoteId) -> bool,
    {
        self.mutations.delete(id, confirm).await
    }

    pub async fn toggle_pin(&self, id: &NoteId, pinned: bool) -> NoteResult<Option<Note>> {
        self.mutations.toggle_pin(id, pinned).await
    }

    /// Plain-text export payload for a note in the current snapshot
    pub fn export(&self, id: &NoteId) -> Option<ExportDocument> {
        self.engine
            .current_snapshot()
            .get(id)
            .map(ExportDocument::from_note)
    }

    pub fn token(&self) -> &InvalidationToken {
        &self.token
    }

    /// Stop background resyncs and any pending search delivery.
    pub fn shutdown(&self) {
        self.search.cancel();
        self.engine.shutdown();
    }
}
