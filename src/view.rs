//! View composition: the filtered, ordered list shown to the user.
//!
//! A view is a pure function of a snapshot and a search query:
//! - a note passes if the query is a case-insensitive substring of its title
//!   or of its raw tags string (no tokenizing); the empty query passes all;
//! - passing notes are ordered pinned first, then newest `created_at` first,
//!   then by id so that equal keys always come out in the same order.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Note, Snapshot};

/// True if `note` passes the search filter for `query`.
pub fn matches_query(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    matches_lowercase(note, &needle)
}

fn matches_lowercase(note: &Note, needle: &str) -> bool {
    needle.is_empty()
        || note.title.to_lowercase().contains(needle)
        || note.tags.to_lowercase().contains(needle)
}

/// Display order: pinned before unpinned, newer before older, then id.
pub fn compare_notes(a: &Note, b: &Note) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort notes into display order in place.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(compare_notes);
}

/// Filter `snapshot` by `query` and return the passing notes in display order.
pub fn view(snapshot: &Snapshot, query: &str) -> Vec<Note> {
    let needle = query.to_lowercase();
    let mut notes: Vec<Note> = snapshot
        .iter()
        .filter(|note| matches_lowercase(note, &needle))
        .cloned()
        .collect();
    sort_notes(&mut notes);
    notes
}

/// Keeps a view current as snapshots and (debounced) queries arrive.
pub struct ViewComposer {
    snapshots: watch::Receiver<Arc<Snapshot>>,
    queries: watch::Receiver<String>,
}

impl ViewComposer {
    pub fn new(snapshots: watch::Receiver<Arc<Snapshot>>, queries: watch::Receiver<String>) -> Self {
        Self { snapshots, queries }
    }

    /// The view for the latest snapshot and query.
    pub fn current(&self) -> Vec<Note> {
        let snapshot = Arc::clone(&self.snapshots.borrow());
        let query = self.queries.borrow().clone();
        view(&snapshot, &query)
    }

    /// The query the current view is filtered by
    pub fn query(&self) -> String {
        self.queries.borrow().clone()
    }

    /// Wait until either input changes and return the recomputed view.
    /// Returns None once either source has shut down.
    pub async fn changed(&mut self) -> Option<Vec<Note>> {
        let result = tokio::select! {
            r = self.snapshots.changed() => r,
            r = self.queries.changed() => r,
        };
        result.ok()?;
        self.snapshots.borrow_and_update();
        self.queries.borrow_and_update();
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteId;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn note(id: i64, title: &str, tags: &str, pinned: bool, created_at: DateTime<Utc>) -> Note {
        Note {
            id: NoteId::from(id),
            title: title.to_string(),
            content: format!("<p>{}</p>", title),
            tags: tags.to_string(),
            pinned,
            created_at,
        }
    }

    fn ids(notes: &[Note]) -> Vec<String> {
        notes.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn test_pinned_older_note_comes_first() {
        let a = note(1, "A", "", false, date(2024, 1, 1));
        let b = note(2, "B", "", true, date(2023, 1, 1));
        let snapshot = Snapshot::from_notes(vec![a, b]);

        assert_eq!(ids(&view(&snapshot, "")), vec!["2", "1"]);
    }

    #[test]
    fn test_newest_first_within_pin_group() {
        let snapshot = Snapshot::from_notes(vec![
            note(1, "old", "", false, date(2022, 5, 1)),
            note(2, "new", "", false, date(2024, 5, 1)),
            note(3, "pinned old", "", true, date(2021, 1, 1)),
            note(4, "pinned new", "", true, date(2023, 1, 1)),
        ]);

        assert_eq!(ids(&view(&snapshot, "")), vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn test_filter_matches_title_or_tags_case_insensitively() {
        let snapshot = Snapshot::from_notes(vec![
            note(1, "Shopping list", "home", false, date(2024, 1, 1)),
            note(2, "Standup", "Work, MEETINGS", false, date(2024, 1, 2)),
            note(3, "Ideas", "misc", false, date(2024, 1, 3)),
        ]);

        assert_eq!(ids(&view(&snapshot, "SHOP")), vec!["1"]);
        assert_eq!(ids(&view(&snapshot, "meeting")), vec!["2"]);
        assert_eq!(ids(&view(&snapshot, "s")), vec!["3", "2", "1"]);
        assert!(view(&snapshot, "zzz").is_empty());
    }

    #[test]
    fn test_filter_is_plain_substring() {
        let snapshot = Snapshot::from_notes(vec![note(1, "t", "work,home", false, date(2024, 1, 1))]);

        // The separator is part of the haystack; no tokenizing.
        assert_eq!(view(&snapshot, "k,h").len(), 1);
        assert!(view(&snapshot, "work home").is_empty());
    }

    #[test]
    fn test_content_is_not_searched() {
        let mut n = note(1, "title", "tag", false, date(2024, 1, 1));
        n.content = "secret body".to_string();
        let snapshot = Snapshot::from_notes(vec![n]);

        assert!(view(&snapshot, "secret").is_empty());
    }

    #[test]
    fn test_equal_keys_order_by_id() {
        let when = date(2024, 1, 1);
        let snapshot = Snapshot::from_notes(vec![
            note(3, "c", "", false, when),
            note(1, "a", "", false, when),
            note(2, "b", "", false, when),
        ]);

        let first = view(&snapshot, "");
        assert_eq!(ids(&first), vec!["1", "2", "3"]);
        assert_eq!(first, view(&snapshot, ""));
    }

    #[tokio::test]
    async fn test_composer_recomputes_on_query_change() {
        let snapshot = Arc::new(Snapshot::from_notes(vec![
            note(1, "alpha", "", false, date(2024, 1, 1)),
            note(2, "beta", "", false, date(2024, 1, 2)),
        ]));
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let (query_tx, query_rx) = watch::channel(String::new());
        let mut composer = ViewComposer::new(snapshot_rx, query_rx);

        assert_eq!(composer.current().len(), 2);

        query_tx.send_replace("alp".to_string());
        let view = composer.changed().await.unwrap();
        assert_eq!(ids(&view), vec!["1"]);
        assert_eq!(composer.query(), "alp");

        snapshot_tx.send_replace(Arc::new(Snapshot::empty()));
        assert!(composer.changed().await.unwrap().is_empty());

        drop(snapshot_tx);
        assert!(composer.changed().await.is_none());
    }

    fn arb_note() -> impl Strategy<Value = Note> {
        (
            0i64..40,
            "[a-zA-Z ]{1,12}",
            "[a-zA-Z, ]{0,12}",
            any::<bool>(),
            0i64..5,
        )
            .prop_map(|(id, title, tags, pinned, day)| {
                note(id, &title, &tags, pinned, date(2024, 1, 1) + chrono::Duration::days(day))
            })
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        prop::collection::vec(arb_note(), 0..30).prop_map(Snapshot::from_notes)
    }

    proptest! {
        #[test]
        fn prop_view_contains_exactly_matching_notes(snapshot in arb_snapshot(), query in "[a-zA-Z,]{0,3}") {
            let result = view(&snapshot, &query);
            let q = query.to_lowercase();
            let expected: Vec<&Note> = snapshot
                .iter()
                .filter(|n| n.title.to_lowercase().contains(&q) || n.tags.to_lowercase().contains(&q))
                .collect();

            prop_assert_eq!(result.len(), expected.len());
            for n in &expected {
                prop_assert!(result.contains(n));
            }
        }

        #[test]
        fn prop_empty_query_keeps_every_note(snapshot in arb_snapshot()) {
            let result = view(&snapshot, "");
            prop_assert_eq!(result.len(), snapshot.len());
            for n in snapshot.iter() {
                prop_assert!(result.contains(n));
            }
        }

        #[test]
        fn prop_sort_is_idempotent(snapshot in arb_snapshot()) {
            let once = view(&snapshot, "");
            let mut twice = once.clone();
            sort_notes(&mut twice);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_pinned_precede_unpinned(snapshot in arb_snapshot(), query in "[a-z]{0,2}") {
            let result = view(&snapshot, &query);
            let first_unpinned = result.iter().position(|n| !n.pinned).unwrap_or(result.len());
            prop_assert!(result[first_unpinned..].iter().all(|n| !n.pinned));
        }

        #[test]
        fn prop_newest_first_within_group(snapshot in arb_snapshot()) {
            let result = view(&snapshot, "");
            for pair in result.windows(2) {
                if pair[0].pinned == pair[1].pinned {
                    prop_assert!(pair[0].created_at >= pair[1].created_at);
                }
            }
        }
    }
}
