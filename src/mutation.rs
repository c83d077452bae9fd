//! Mutation coordinator: every create, update, delete and pin toggle goes
//! through here.
//!
//! Each operation validates its input, calls the gateway, and only when the
//! gateway reports success flips the invalidation token so the engine
//! refetches. Failures are returned to the caller and leave both the token
//! and the local snapshot untouched.

use std::sync::Arc;

use crate::error::NoteResult;
use crate::gateway::NoteGateway;
use crate::invalidation::InvalidationToken;
use crate::models::{Note, NoteDraft, NoteId, NotePatch};
use crate::selection::Selection;
use crate::validation::{validate_draft, validate_patch};

pub struct MutationCoordinator<G> {
    gateway: Arc<G>,
    token: InvalidationToken,
    selection: Arc<Selection>,
}

impl<G: NoteGateway> MutationCoordinator<G> {
    pub fn new(gateway: Arc<G>, token: InvalidationToken, selection: Arc<Selection>) -> Self {
        Self {
            gateway,
            token,
            selection,
        }
    }

    /// Create a note. Clears the selection on success so the editor starts
    /// from a blank draft.
    ///
    /// # Returns
    /// * `Ok(Some(Note))` - Created, and the store echoed the note
    /// * `Ok(None)` - Created; the note will show up with the next resync
    pub async fn create(&self, draft: NoteDraft) -> NoteResult<Option<Note>> {
        validate_draft(&draft)?;

        let created = self
            .gateway
            .create(&draft)
            .await
            .inspect_err(|e| tracing::warn!("Failed to create note: {}", e))?;

        self.token.flip();
        self.selection.clear();
        tracing::info!("Created note '{}'", draft.title);
        Ok(created)
    }

    /// Replace every editable field of an existing note. Clears the selection
    /// on success, closing the editor the same way create does.
    pub async fn update(&self, id: &NoteId, draft: NoteDraft) -> NoteResult<Option<Note>> {
        validate_draft(&draft)?;
        let updated = self.apply(id, NotePatch::from(draft)).await?;
        self.selection.clear();
        Ok(updated)
    }

    /// Change only the fields carried by `patch`. The selection is left alone.
    pub async fn patch(&self, id: &NoteId, patch: NotePatch) -> NoteResult<Option<Note>> {
        validate_patch(&patch)?;
        self.apply(id, patch).await
    }

    /// Set the pinned flag. Only `pinned` is sent to the store, so toggles on
    /// different notes can be issued concurrently without waiting on each
    /// other's resync.
    pub async fn toggle_pin(&self, id: &NoteId, pinned: bool) -> NoteResult<Option<Note>> {
        self.apply(id, NotePatch::pinned(pinned)).await
    }

    /// Delete a note once `confirm` agrees.
    ///
    /// # Returns
    /// * `Ok(true)` - Deleted; selection cleared if it pointed at the note
    /// * `Ok(false)` - The user declined; nothing was sent
    pub async fn delete<F>(&self, id: &NoteId, confirm: F) -> NoteResult<bool>
    where
        F: FnOnce(&NoteId) -> bool,
    {
        if !confirm(id) {
            tracing::debug!("Deletion of note {} declined", id);
            return Ok(false);
        }

        self.gateway
            .delete(id)
            .await
            .inspect_err(|e| tracing::warn!("Failed to delete note {}: {}", id, e))?;

        self.token.flip();
        self.selection.clear_if(id);
        tracing::info!("Deleted note {}", id);
        Ok(true)
    }

    async fn apply(&self, id: &NoteId, patch: NotePatch) -> NoteResult<Option<Note>> {
        let updated = self
            .gateway
            .update(id, &patch)
            .await
            .inspect_err(|e| tracing::warn!("Failed to update note {}: {}", id, e))?;

        self.token.flip();
        tracing::debug!("Updated note {}", id);
        Ok(updated)
    }
}
