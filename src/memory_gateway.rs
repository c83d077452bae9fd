//! In-process note store.
//!
//! Behaves like the remote store (store-assigned integer ids, server-side
//! creation timestamps, partial updates) without any I/O. Failures and
//! latency can be injected per operation, and every call is counted.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{NoteError, NoteResult};
use crate::gateway::NoteGateway;
use crate::models::{Note, NoteDraft, NoteId, NotePatch};

/// The four gateway operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    FetchAll,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct MemoryState {
    notes: BTreeMap<i64, Note>,
    next_id: i64,
    failing: HashSet<GatewayOp>,
    calls: HashMap<GatewayOp, usize>,
    fetch_delays: VecDeque<Duration>,
    clock: Option<DateTime<Utc>>,
}

/// Note store kept in memory
#[derive(Default)]
pub struct MemoryNoteGateway {
    state: Mutex<MemoryState>,
}

impl MemoryNoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with notes as if they had been created earlier.
    /// Notes whose id is not an integer are skipped.
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let gateway = Self::new();
        for note in notes {
            gateway.insert(note);
        }
        gateway
    }

    /// Insert or replace a note directly, bypassing the gateway operations.
    pub fn insert(&self, note: Note) {
        let Ok(id) = note.id.as_str().parse::<i64>() else {
            tracing::warn!("MemoryNoteGateway ignores non-integer id {}", note.id);
            return;
        };
        let mut state = self.lock();
        state.next_id = state.next_id.max(id);
        state.notes.insert(id, note);
    }

    /// Make every call to `op` fail with a network error until cleared.
    pub fn set_failing(&self, op: GatewayOp, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    /// Delay the next `fetch_all` by `delay`. Delays queue up in call order.
    /// The response reflects the store as it was when the request arrived.
    pub fn push_fetch_delay(&self, delay: Duration) {
        self.lock().fetch_delays.push_back(delay);
    }

    /// Fix the timestamp given to newly created notes.
    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.lock().clock = Some(now);
    }

    /// Number of times `op` has been invoked, failed calls included.
    pub fn calls(&self, op: GatewayOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current server-side copy of a note.
    pub fn note(&self, id: &NoteId) -> Option<Note> {
        let id = id.as_str().parse::<i64>().ok()?;
        self.lock().notes.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().notes.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and fail it if requested.
    fn begin(&self, op: GatewayOp) -> NoteResult<()> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(&op) {
            return Err(NoteError::Network(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    fn resolve(&self, state: &MemoryState, id: &NoteId) -> NoteResult<i64> {
        id.as_str()
            .parse::<i64>()
            .ok()
            .filter(|key| state.notes.contains_key(key))
            .ok_or_else(|| NoteError::NotFound(format!("note {}", id)))
    }
}

impl NoteGateway for MemoryNoteGateway {
    async fn fetch_all(&self) -> NoteResult<Vec<Note>> {
        self.begin(GatewayOp::FetchAll)?;
        let (notes, delay) = {
            let mut state = self.lock();
            let notes: Vec<Note> = state.notes.values().cloned().collect();
            (notes, state.fetch_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(notes)
    }

    async fn create(&self, draft: &NoteDraft) -> NoteResult<Option<Note>> {
        self.begin(GatewayOp::Create)?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        let note = Note {
            id: NoteId::from(id),
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            pinned: draft.pinned,
            created_at: state.clock.unwrap_or_else(Utc::now),
        };
        state.notes.insert(id, note.clone());
        Ok(Some(note))
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> NoteResult<Option<Note>> {
        self.begin(GatewayOp::Update)?;
        let mut state = self.lock();
        let key = self.resolve(&state, id)?;
        let note = state
            .notes
            .get_mut(&key)
            .ok_or_else(|| NoteError::NotFound(format!("note {}", id)))?;
        patch.apply_to(note);
        Ok(Some(note.clone()))
    }

    async fn delete(&self, id: &NoteId) -> NoteResult<()> {
        self.begin(GatewayOp::Delete)?;
        let mut state = self.lock();
        let key = self.resolve(&state, id)?;
        state.notes.remove(&key);
        Ok(())
    }
}
