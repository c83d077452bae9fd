//! The note currently open for editing.
//!
//! At most one note is selected. Selection is tracked by id and resolved
//! against whatever snapshot is current, so a note that disappears on
//! resync simply stops being selected.

use std::sync::Mutex;

use crate::models::{Note, NoteId, Snapshot};

#[derive(Debug, Default)]
pub struct Selection {
    selected: Mutex<Option<NoteId>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a note for editing, replacing any previous selection.
    pub fn select(&self, id: NoteId) {
        tracing::debug!("Selected note {}", id);
        *self.lock() = Some(id);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn selected(&self) -> Option<NoteId> {
        self.lock().clone()
    }

    pub fn is_selected(&self, id: &NoteId) -> bool {
        self.lock().as_ref() == Some(id)
    }

    /// Clear the selection if it points at `id`. Returns true if it did.
    pub fn clear_if(&self, id: &NoteId) -> bool {
        let mut selected = self.lock();
        if selected.as_ref() == Some(id) {
            *selected = None;
            true
        } else {
            false
        }
    }

    /// Drop the selection if the selected note is missing from `snapshot`.
    /// Returns true if the selection was cleared.
    pub fn reconcile(&self, snapshot: &Snapshot) -> bool {
        let mut selected = self.lock();
        match selected.as_ref() {
            Some(id) if !snapshot.contains(id) => {
                tracing::debug!("Selected note {} no longer exists; clearing selection", id);
                *selected = None;
                true
            }
            _ => false,
        }
    }

    /// The selected note as it appears in `snapshot`, if both exist.
    pub fn selected_note(&self, snapshot: &Snapshot) -> Option<Note> {
        let selected = self.lock();
        selected.as_ref().and_then(|id| snapshot.get(id)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<NoteId>> {
        self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(id: i64) -> Note {
        Note {
            id: NoteId::from(id),
            title: format!("note {}", id),
            content: String::new(),
            tags: String::new(),
            pinned: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_select_and_clear() {
        let selection = Selection::new();
        assert!(selection.selected().is_none());

        selection.select(NoteId::from(1));
        assert!(selection.is_selected(&NoteId::from(1)));

        selection.select(NoteId::from(2));
        assert_eq!(selection.selected(), Some(NoteId::from(2)));

        selection.clear();
        assert!(selection.selected().is_none());
    }

    #[test]
    fn test_clear_if_only_matches_selected() {
        let selection = Selection::new();
        selection.select(NoteId::from(1));

        assert!(!selection.clear_if(&NoteId::from(2)));
        assert!(selection.is_selected(&NoteId::from(1)));
        assert!(selection.clear_if(&NoteId::from(1)));
        assert!(selection.selected().is_none());
    }

    #[test]
    fn test_reconcile_clears_vanished_note() {
        let selection = Selection::new();
        selection.select(NoteId::from(3));

        let with_note = Snapshot::from_notes(vec![note(1), note(3)]);
        assert!(!selection.reconcile(&with_note));
        assert_eq!(selection.selected_note(&with_note).unwrap().title, "note 3");

        let without_note = Snapshot::from_notes(vec![note(1)]);
        assert!(selection.selected_note(&without_note).is_none());
        assert!(selection.reconcile(&without_note));
        assert!(selection.selected().is_none());
    }
}
