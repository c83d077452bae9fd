//! Remote note store abstraction.
//!
//! The synchronization engine and the mutation coordinator only ever talk to
//! the store through this trait, which exposes exactly four operations.
//! `http_gateway` is the production implementation; `memory_gateway` keeps
//! everything in process.

use std::future::Future;

use crate::error::NoteResult;
use crate::models::{Note, NoteDraft, NoteId, NotePatch};

/// Trait for remote note store implementations.
///
/// # Example
///
/// ```ignore
/// use notesync::gateway::NoteGateway;
///
/// async fn count_notes(gateway: &impl NoteGateway) -> usize {
///     gateway.fetch_all().await.map(|notes| notes.len()).unwrap_or(0)
/// }
/// ```
pub trait NoteGateway: Send + Sync {
    /// Fetch every note owned by the session.
    ///
    /// # Returns
    /// * `Ok(Vec<Note>)` - The full collection, in no particular order
    /// * `Err(NoteError)` - Transport, auth or decode failure
    fn fetch_all(&self) -> impl Future<Output = NoteResult<Vec<Note>>> + Send;

    /// Create a note.
    ///
    /// # Returns
    /// * `Ok(Some(Note))` - The store echoed the created note
    /// * `Ok(None)` - The store acknowledged without a body we can decode
    fn create(&self, draft: &NoteDraft) -> impl Future<Output = NoteResult<Option<Note>>> + Send;

    /// Update an existing note with the fields carried by `patch`.
    fn update(
        &self,
        id: &NoteId,
        patch: &NotePatch,
    ) -> impl Future<Output = NoteResult<Option<Note>>> + Send;

    /// Delete a note.
    fn delete(&self, id: &NoteId) -> impl Future<Output = NoteResult<()>> + Send;
}
