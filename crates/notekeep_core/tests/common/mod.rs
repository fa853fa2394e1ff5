#![allow(dead_code)]

use notekeep_core::{
    BufferId, EditorHost, MemoryHost, MemoryNoteStore, Note, NoteFilter, NoteFlags, NoteStore,
    StoreError, StoreResult, Tag,
};
use std::cell::{Cell, RefCell};

/// Memory store that records updates and can reject them.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryNoteStore,
    updates: RefCell<Vec<Note>>,
    fail_updates: Cell<bool>,
}

impl RecordingStore {
    pub fn updates(&self) -> Vec<Note> {
        self.updates.borrow().clone()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.set(fail);
    }
}

impl NoteStore for RecordingStore {
    fn create_note(&self, title: &str, text: &str) -> StoreResult<Note> {
        self.inner.create_note(title, text)
    }

    fn get_note(&self, id: &str) -> StoreResult<Note> {
        self.inner.get_note(id)
    }

    fn update_note(&self, note: &Note) -> StoreResult<()> {
        if self.fail_updates.get() {
            return Err(StoreError::Unavailable("remote rejected update".to_string()));
        }
        self.updates.borrow_mut().push(note.clone());
        self.inner.update_note(note)
    }

    fn list_notes(&self, filter: &NoteFilter) -> StoreResult<Vec<Note>> {
        self.inner.list_notes(filter)
    }

    fn count_all(&self) -> StoreResult<usize> {
        self.inner.count_all()
    }

    fn list_labels(&self) -> StoreResult<Vec<Tag>> {
        self.inner.list_labels()
    }

    fn set_note_labels(&self, id: &str, names: &[String]) -> StoreResult<()> {
        self.inner.set_note_labels(id, names)
    }
}

/// Two notes labeled `Work` plus one loose note.
pub fn seed(store: &MemoryNoteStore) {
    store.insert_label("t-work", "Work");
    store.insert_note(Note::new("n1", "Alpha", "first body\n"), NoteFlags::default());
    store.insert_note(Note::new("n2", "Beta", ""), NoteFlags::default());
    store.insert_note(Note::new("n3", "Loose", "loose body\n"), NoteFlags::default());
    let work = vec!["Work".to_string()];
    store.set_note_labels("n1", &work).expect("label n1");
    store.set_note_labels("n2", &work).expect("label n2");
}

pub fn seeded_store() -> RecordingStore {
    let store = RecordingStore::default();
    seed(&store.inner);
    store
}

/// Row of the line carrying `key`.
pub fn row_of(host: &MemoryHost, buffer: BufferId, key: &str) -> usize {
    let marker = format!("[{key}]");
    host.buffer_lines(buffer)
        .iter()
        .position(|line| line.ends_with(&marker))
        .unwrap_or_else(|| panic!("no line for key {key}"))
}

/// Replaces `from` with `to` on the line carrying `key`, as a user would.
pub fn edit_line(host: &mut MemoryHost, buffer: BufferId, key: &str, from: &str, to: &str) {
    let row = row_of(host, buffer, key);
    let line = host.buffer_lines(buffer)[row].replacen(from, to, 1);
    host.type_line(buffer, row, &line);
}
