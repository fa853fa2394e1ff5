//! In-memory note store.
//!
//! # Responsibility
//! - Provide a deterministic `NoteStore` for tests, demos and headless use.
//!
//! # Invariants
//! - Listing preserves insertion order.
//! - Label names are unique case-insensitively.

use super::{matches_search_words, NoteFilter, NoteFlags, NoteStore, StoreError, StoreResult};
use crate::model::note::{Note, Tag};
use log::debug;
use std::cell::RefCell;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredNote {
    note: Note,
    flags: NoteFlags,
    labels: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: Vec<StoredNote>,
    labels: Vec<Tag>,
}

/// `NoteStore` kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    state: RefCell<MemoryState>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a note with a caller-chosen id, replacing any previous one.
    pub fn insert_note(&self, note: Note, flags: NoteFlags) {
        let mut state = self.state.borrow_mut();
        state.notes.retain(|stored| stored.note.id != note.id);
        state.notes.push(StoredNote {
            note,
            flags,
            labels: Vec::new(),
        });
    }

    /// Drops a note; returns whether it existed.
    pub fn remove_note(&self, id: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.notes.len();
        state.notes.retain(|stored| stored.note.id != id);
        state.notes.len() != before
    }

    /// Registers a label with a caller-chosen id and returns it.
    pub fn insert_label(&self, id: impl Into<String>, name: impl Into<String>) -> Tag {
        let tag = Tag::new(id, name);
        let mut state = self.state.borrow_mut();
        state
            .labels
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&tag.name));
        state.labels.push(tag.clone());
        tag
    }

    /// Replaces the flags of one stored note.
    pub fn set_flags(&self, id: &str, flags: NoteFlags) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let stored = state
            .notes
            .iter_mut()
            .find(|stored| stored.note.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        stored.flags = flags;
        Ok(())
    }
}

impl NoteStore for MemoryNoteStore {
    fn create_note(&self, title: &str, text: &str) -> StoreResult<Note> {
        let note = Note::new(Uuid::new_v4().to_string(), title, text);
        self.insert_note(note.clone(), NoteFlags::default());
        debug!("event=note_create module=store.memory status=ok");
        Ok(note)
    }

    fn get_note(&self, id: &str) -> StoreResult<Note> {
        self.state
            .borrow()
            .notes
            .iter()
            .find(|stored| stored.note.id == id)
            .map(|stored| stored.note.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update_note(&self, note: &Note) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let stored = state
            .notes
            .iter_mut()
            .find(|stored| stored.note.id == note.id)
            .ok_or_else(|| StoreError::NotFound(note.id.clone()))?;
        stored.note.title = note.title.clone();
        stored.note.text = note.text.clone();
        Ok(())
    }

    fn list_notes(&self, filter: &NoteFilter) -> StoreResult<Vec<Note>> {
        let state = self.state.borrow();
        let notes = state
            .notes
            .iter()
            .filter(|stored| stored.flags.matches(filter))
            .filter(|stored| match filter.labels.as_ref() {
                Some(wanted) => wanted.iter().any(|name| {
                    stored
                        .labels
                        .iter()
                        .any(|label| label.eq_ignore_ascii_case(name))
                }),
                None => true,
            })
            .filter(|stored| match filter.search_words.as_deref() {
                Some(words) => matches_search_words(&stored.note, words),
                None => true,
            })
            .map(|stored| stored.note.clone())
            .collect();
        Ok(notes)
    }

    fn count_all(&self) -> StoreResult<usize> {
        Ok(self.state.borrow().notes.len())
    }

    fn list_labels(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.state.borrow().labels.clone())
    }

    fn set_note_labels(&self, id: &str, names: &[String]) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        for name in names {
            let known = state
                .labels
                .iter()
                .any(|label| label.name.eq_ignore_ascii_case(name));
            if !known {
                state
                    .labels
                    .push(Tag::new(Uuid::new_v4().to_string(), name.clone()));
            }
        }

        let stored = state
            .notes
            .iter_mut()
            .find(|stored| stored.note.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        stored.labels = names.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryNoteStore;
    use crate::model::note::Note;
    use crate::store::{NoteFilter, NoteFlags, NoteStore, StoreError};

    #[test]
    fn create_assigns_distinct_ids() {
        let store = MemoryNoteStore::new();
        let first = store.create_note("a", "").expect("create first");
        let second = store.create_note("b", "").expect("create second");
        assert_ne!(first.id, second.id);
        assert_eq!(store.count_all().expect("count"), 2);
    }

    #[test]
    fn update_replaces_title_and_text_only() {
        let store = MemoryNoteStore::new();
        store.insert_note(
            Note::new("n1", "old", "body"),
            NoteFlags {
                pinned: true,
                ..NoteFlags::default()
            },
        );
        store
            .update_note(&Note::new("n1", "new", "other"))
            .expect("update");

        let pinned = NoteFilter {
            pinned: Some(true),
            ..NoteFilter::default()
        };
        let listed = store.list_notes(&pinned).expect("list");
        assert_eq!(listed, vec![Note::new("n1", "new", "other")]);
    }

    #[test]
    fn update_of_unknown_note_is_not_found() {
        let store = MemoryNoteStore::new();
        let err = store
            .update_note(&Note::new("missing", "t", ""))
            .expect_err("unknown id must fail");
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn labels_filter_is_case_insensitive() {
        let store = MemoryNoteStore::new();
        store.insert_note(Note::new("n1", "one", ""), NoteFlags::default());
        store.insert_note(Note::new("n2", "two", ""), NoteFlags::default());
        store
            .set_note_labels("n1", &["Work".to_string()])
            .expect("label");

        let listed = store.list_notes(&NoteFilter::labeled("work")).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "n1");
        assert_eq!(store.list_labels().expect("labels").len(), 1);
    }
}
