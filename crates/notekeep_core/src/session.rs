//! Editor session: explorer, opened notes and their store.
//!
//! # Responsibility
//! - Own the store, host, explorer and open-note tracker of one editor.
//! - Route editor buffer events to the explorer or the tracker.
//! - Implement the user commands on top of both.
//!
//! # Invariants
//! - Remote failures are shown to the user once and returned; nothing is
//!   retried.
//! - A failed note save leaves the note buffer untouched.

use crate::explorer::config::ExplorerConfig;
use crate::explorer::{Activation, CommitSummary, Explorer, ExplorerError};
use crate::host::{BufferId, EditorHost};
use crate::model::note::Note;
use crate::store::{NoteStore, StoreError};
use crate::tracker::{extract_title_and_body, OpenNoteTracker, TrackerError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Warning box shown when a note could not be written to the store.
pub const SAVE_FAILURE_WARNING: &str = "\
+------------------- WARNING -------------------+
|                                               |
| Failed to save note (see error above)         |
|                                               |
| Save buffer to a file to avoid losing content |
|                                               |
+------------------- WARNING -------------------+
";

pub const EMPTY_NOTE_WARNING: &str = "Cannot save empty note.";

#[derive(Debug)]
pub enum SessionError {
    Explorer(ExplorerError),
    Tracker(TrackerError),
    Store(StoreError),
    /// `save_buffer_as_note` was called on a buffer without lines.
    EmptyNote,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explorer(err) => write!(f, "{err}"),
            Self::Tracker(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::EmptyNote => f.write_str(EMPTY_NOTE_WARNING),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Explorer(err) => Some(err),
            Self::Tracker(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::EmptyNote => None,
        }
    }
}

impl From<ExplorerError> for SessionError {
    fn from(value: ExplorerError) -> Self {
        Self::Explorer(value)
    }
}

impl From<TrackerError> for SessionError {
    fn from(value: TrackerError) -> Self {
        Self::Tracker(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One editor's explorer and opened notes.
pub struct Session<S: NoteStore, H: EditorHost> {
    store: S,
    host: H,
    explorer: Explorer,
    tracker: OpenNoteTracker,
}

impl<S: NoteStore, H: EditorHost> Session<S, H> {
    /// Builds a session and loads the explorer model.
    pub fn new(store: S, host: H, config: ExplorerConfig) -> SessionResult<Self> {
        let explorer = Explorer::load(config, &store)?;
        info!(
            "event=session_start module=session status=ok note_count={}",
            explorer.note_count()
        );
        Ok(Self {
            store,
            host,
            explorer,
            tracker: OpenNoteTracker::new(),
        })
    }

    /// Builds a session configured from the host's global settings.
    pub fn from_host(store: S, host: H) -> SessionResult<Self> {
        let config = ExplorerConfig::from_host(&host);
        Self::new(store, host, config)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub fn tracker(&self) -> &OpenNoteTracker {
        &self.tracker
    }

    /// Pre-save event: commit explorer edits, or snapshot a note's dirty flag.
    pub fn on_before_save(&mut self, buffer: BufferId) -> SessionResult<()> {
        if self.is_explorer_buffer(buffer) {
            let result = self.explorer.commit_changes(&self.host, &self.store);
            self.report(result)?;
            return Ok(());
        }
        self.tracker.prepare_to_save(buffer, &self.host);
        Ok(())
    }

    /// Post-save event: re-render the explorer, or store a modified note and
    /// reload its explorer lines.
    pub fn on_after_save(&mut self, buffer: BufferId) -> SessionResult<()> {
        if self.is_explorer_buffer(buffer) {
            let result = self.explorer.render(&mut self.host);
            return self.report(result);
        }

        let Some(note) = self.tracker.commit_changes_to_note(buffer, &self.host) else {
            return Ok(());
        };
        if let Err(err) = self.store.update_note(&note) {
            self.report_save_failure(&err);
            return Err(err.into());
        }
        info!("event=note_save module=session status=ok buffer={buffer}");

        let reloaded = self.explorer.reload_note(&self.store, &note.id);
        if self.report(reloaded)? > 0 {
            let rendered = self.explorer.render(&mut self.host);
            self.report(rendered)?;
        }
        Ok(())
    }

    /// Buffer-delete event: forget a tracked note.
    pub fn on_buffer_closed(&mut self, buffer: BufferId) {
        self.tracker.close(buffer);
    }

    pub fn toggle_explorer(&mut self) -> SessionResult<()> {
        if self.explorer.is_hidden() {
            let result = self.explorer.show(&mut self.host);
            self.report(result)
        } else {
            self.explorer.hide(&mut self.host);
            Ok(())
        }
    }

    /// Activates the explorer line at `row`, opening notes and toggling tags.
    pub fn activate_node(&mut self, row: usize) -> SessionResult<Option<Activation>> {
        let result = self.explorer.activate_node(&mut self.host, &self.store, row);
        let activation = self.report(result)?;
        if let Some(Activation::OpenNote(note)) = activation.as_ref() {
            let opened = self.tracker.open(note, &self.store, &mut self.host);
            self.report(opened)?;
        }
        Ok(activation)
    }

    /// Activates the explorer line under the cursor.
    pub fn activate_selected(&mut self) -> SessionResult<Option<Activation>> {
        let row = self
            .explorer
            .buffer()
            .and_then(|buffer| self.host.cursor_row(buffer));
        match row {
            Some(row) => self.activate_node(row),
            None => Ok(None),
        }
    }

    /// Replaces the explorer's search results and re-renders.
    pub fn search(&mut self, words: &str) -> SessionResult<usize> {
        let result = self.explorer.search(&self.store, words);
        let found = self.report(result)?;
        let rendered = self.explorer.render(&mut self.host);
        self.report(rendered)?;
        Ok(found)
    }

    /// Commits explorer edits, reloads the model and re-renders.
    pub fn sync(&mut self) -> SessionResult<CommitSummary> {
        let committed = self.explorer.commit_changes(&self.host, &self.store);
        let summary = self.report(committed)?;
        let refreshed = self.explorer.refresh(&self.store);
        self.report(refreshed)?;
        let rendered = self.explorer.render(&mut self.host);
        self.report(rendered)?;
        Ok(summary)
    }

    /// Creates an empty note titled `title` and opens it.
    ///
    /// Surrounding quotes are stripped from the title.
    pub fn create_note(&mut self, title: &str) -> SessionResult<Note> {
        let title = title.trim_matches(|c| c == '"' || c == '\'');
        let note = match self.store.create_note(title, "") {
            Ok(note) => note,
            Err(err) => {
                self.report_save_failure(&err);
                return Err(err.into());
            }
        };
        self.open_and_list(note)
    }

    /// Stores the contents of an arbitrary buffer as a new note and opens it.
    pub fn save_buffer_as_note(&mut self, buffer: BufferId) -> SessionResult<Note> {
        let lines = self.host.buffer_lines(buffer);
        if lines.is_empty() {
            self.host.show_warning(EMPTY_NOTE_WARNING);
            return Err(SessionError::EmptyNote);
        }

        let (title, body) = extract_title_and_body(&lines, "");
        let created = self
            .store
            .create_note(&title, &body)
            .and_then(|note| self.store.get_note(&note.id));
        let note = match created {
            Ok(note) => note,
            Err(err) => {
                self.report_save_failure(&err);
                return Err(err.into());
            }
        };
        self.open_and_list(note)
    }

    /// Closes every opened note and removes the explorer's backing file.
    pub fn terminate(&mut self) {
        self.tracker.close_all();
        self.explorer.discard_data_file();
        info!("event=session_end module=session status=ok");
    }

    fn open_and_list(&mut self, note: Note) -> SessionResult<Note> {
        let opened = self.tracker.open(&note, &self.store, &mut self.host);
        self.report(opened)?;
        self.explorer.add_note(note.clone());
        let rendered = self.explorer.render(&mut self.host);
        self.report(rendered)?;
        Ok(note)
    }

    fn is_explorer_buffer(&self, buffer: BufferId) -> bool {
        self.explorer.buffer() == Some(buffer)
    }

    /// Shows a failed command's error to the user and converts it.
    fn report<T, E>(&mut self, result: Result<T, E>) -> SessionResult<T>
    where
        E: Into<SessionError>,
    {
        result.map_err(|err| {
            let err = err.into();
            warn!("event=command_failed module=session status=error error={err}");
            self.host.show_warning(&err.to_string());
            err
        })
    }

    fn report_save_failure(&mut self, err: &StoreError) {
        warn!("event=note_save module=session status=error error={err}");
        self.host.show_warning(&format!("{err}\n{SAVE_FAILURE_WARNING}"));
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionError, EMPTY_NOTE_WARNING};
    use crate::explorer::config::ExplorerConfig;
    use crate::host::{EditorHost, MemoryHost};
    use crate::model::note::Note;
    use crate::store::{MemoryNoteStore, NoteFlags, NoteStore};

    fn session() -> Session<MemoryNoteStore, MemoryHost> {
        let store = MemoryNoteStore::new();
        store.insert_note(Note::new("n1", "First", "body\n"), NoteFlags::default());
        Session::new(store, MemoryHost::new(), ExplorerConfig::default()).expect("session")
    }

    #[test]
    fn create_note_strips_quotes_and_lists_it() {
        let mut session = session();
        session.toggle_explorer().expect("show explorer");

        let note = session.create_note("\"Groceries\"").expect("create note");
        assert_eq!(note.title, "Groceries");
        assert!(session.tracker().is_opened(&note.id));
        assert_eq!(session.explorer().notes().len(), 2);

        let buffer = session.explorer().buffer().expect("explorer buffer");
        assert!(session
            .host()
            .buffer_lines(buffer)
            .iter()
            .any(|line| line.starts_with("Groceries")));
        session.terminate();
    }

    #[test]
    fn empty_buffer_cannot_become_a_note() {
        let mut session = session();
        let buffer = session.host_mut().add_scratch_buffer(&[]);

        let err = session
            .save_buffer_as_note(buffer)
            .expect_err("empty buffer must be rejected");
        assert!(matches!(err, SessionError::EmptyNote));
        assert_eq!(session.host().warnings(), &[EMPTY_NOTE_WARNING.to_string()]);
    }

    #[test]
    fn buffer_saved_as_note_is_created_and_opened() {
        let mut session = session();
        let buffer = session
            .host_mut()
            .add_scratch_buffer(&["Idea", "", "details"]);

        let note = session.save_buffer_as_note(buffer).expect("save as note");
        let stored = session.store().get_note(&note.id).expect("stored note");
        assert_eq!(stored.title, "Idea");
        assert_eq!(stored.text, "details\n");
        assert!(session.tracker().is_opened(&note.id));
        session.terminate();
        assert!(session.tracker().is_empty());
    }

    #[test]
    fn toggle_shows_then_hides() {
        let mut session = session();
        assert!(session.explorer().is_hidden());
        session.toggle_explorer().expect("show");
        assert!(!session.explorer().is_hidden());
        session.toggle_explorer().expect("hide");
        assert!(session.explorer().is_hidden());
        session.terminate();
    }
}
