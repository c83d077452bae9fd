//! Input validation for notesync.
//!
//! Drafts and patches are checked here before anything goes over the wire.
//! All validators return NoteError::Validation on failure.

use crate::error::{NoteResult, ValidationError};
use crate::models::{NoteDraft, NotePatch};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_TAGS_LENGTH: usize = 100;

/// Validate a note title.
///
/// Titles must be non-empty and no longer than MAX_TITLE_LENGTH characters.
/// Whitespace counts as content; the title itself is never rewritten.
pub fn validate_title(title: &str) -> NoteResult<()> {
    if title.is_empty() {
        return Err(ValidationError::new("title", "cannot be empty").into());
    }

    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::new(
            "title",
            format!(
                "cannot exceed {} characters (got {})",
                MAX_TITLE_LENGTH, length
            ),
        )
        .into());
    }

    Ok(())
}

/// Validate the tags field. Tags are free-form; only the length is bounded.
pub fn validate_tags(tags: &str) -> NoteResult<()> {
    let length = tags.chars().count();
    if length > MAX_TAGS_LENGTH {
        return Err(ValidationError::new(
            "tags",
            format!("cannot exceed {} characters (got {})", MAX_TAGS_LENGTH, length),
        )
        .into());
    }
    Ok(())
}

/// Validate a full draft for create or update.
pub fn validate_draft(draft: &NoteDraft) -> NoteResult<()> {
    validate_title(&draft.title)?;
    validate_tags(&draft.tags)?;
    Ok(())
}

/// Validate only the fields a patch carries.
pub fn validate_patch(patch: &NotePatch) -> NoteResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::new("patch", "must change at least one field").into());
    }
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(tags) = &patch.tags {
        validate_tags(tags)?;
    }
    Ok(())
}
