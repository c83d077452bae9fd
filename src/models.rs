//! Data models for notesync.
//!
//! This module defines the core entities: Note, the drafts and patches sent
//! to the remote store, and the Snapshot of the whole collection.
//! Ids are assigned by the store and kept opaque on the client.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque note identifier assigned by the remote store.
///
/// The store may hand out integers or strings; both decode to the same
/// textual form so the client never interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        NoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        NoteId(id.to_string())
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        NoteId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => NoteId(n.to_string()),
            RawId::Str(s) => NoteId(s),
        })
    }
}

/// A note as held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier, immutable after creation
    pub id: NoteId,
    /// Title, 1..=100 characters
    pub title: String,
    /// Rich-text markup; may be empty
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Free-form comma-separated tags, kept verbatim
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,
    /// Set by the store at creation
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Full set of editable fields, used for create and full update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: String,
    pub pinned: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            pinned: note.pinned,
        }
    }
}

/// Partial update: only the fields that are `Some` go over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl NotePatch {
    /// Patch that only changes the pinned flag.
    pub fn pinned(pinned: bool) -> Self {
        Self {
            pinned: Some(pinned),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none() && self.pinned.is_none()
    }

    /// Apply the carried fields to a note.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            note.tags = tags.clone();
        }
        if let Some(pinned) = self.pinned {
            note.pinned = pinned;
        }
    }
}

impl From<NoteDraft> for NotePatch {
    fn from(draft: NoteDraft) -> Self {
        Self {
            title: Some(draft.title),
            content: Some(draft.content),
            tags: Some(draft.tags),
            pinned: Some(draft.pinned),
        }
    }
}

/// Complete local copy of the note collection at one point in time.
///
/// Keyed by id; carries no order. Display order is computed by the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    notes: HashMap<NoteId, Note>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from a fetched list. A repeated id keeps the last
    /// occurrence.
    pub fn from_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let notes = notes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self { notes }
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.notes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NoteId> {
        self.notes.keys()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decoding for `created_at`.
///
/// The store may emit RFC 3339, an HTTP-date (`Mon, 01 Jan 2024 00:00:00 GMT`)
/// or a naive `YYYY-MM-DD HH:MM:SS` / ISO string, which is taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_note_id_from_number_and_string() {
        let from_int: NoteId = serde_json::from_str("5").unwrap();
        let from_str: NoteId = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(from_int.as_str(), "5");
    }

    #[test]
    fn test_note_decodes_store_payload() {
        let json = r#"{
            "id": 7,
            "title": "Groceries",
            "content": "<p>milk</p>",
            "tags": "home, Errands",
            "pinned": true,
            "created_at": "Mon, 01 Jan 2024 10:30:00 GMT"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();

        assert_eq!(note.id, NoteId::from(7));
        assert_eq!(note.tags, "home, Errands");
        assert!(note.pinned);
        assert_eq!(note.created_at, Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_note_null_fields_default() {
        let json = r#"{"id": "a", "title": "t", "content": null, "tags": null, "pinned": null,
                       "created_at": "2024-01-01T00:00:00Z"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.content, "");
        assert_eq!(note.tags, "");
        assert!(!note.pinned);
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
        assert_eq!(timestamp::parse("2024-03-02T08:00:00+00:00"), Some(expected));
        assert_eq!(timestamp::parse("Sat, 02 Mar 2024 08:00:00 GMT"), Some(expected));
        assert_eq!(timestamp::parse("2024-03-02 08:00:00"), Some(expected));
        assert_eq!(timestamp::parse("2024-03-02T08:00:00"), Some(expected));
        assert_eq!(timestamp::parse("yesterday"), None);
    }

    #[test]
    fn test_pin_patch_serializes_only_pinned() {
        let body = serde_json::to_value(NotePatch::pinned(true)).unwrap();
        assert_eq!(body, serde_json::json!({ "pinned": true }));
    }

    #[test]
    fn test_snapshot_keyed_by_id() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let note = |id: i64, title: &str| Note {
            id: NoteId::from(id),
            title: title.to_string(),
            content: String::new(),
            tags: String::new(),
            pinned: false,
            created_at,
        };
        let snapshot = Snapshot::from_notes(vec![note(1, "a"), note(2, "b"), note(1, "c")]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&NoteId::from(1)).unwrap().title, "c");
        assert!(snapshot.contains(&NoteId::from(2)));
        assert!(!snapshot.contains(&NoteId::from(3)));
    }
}
