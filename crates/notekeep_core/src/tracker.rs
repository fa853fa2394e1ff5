//! Open-note tracking.
//!
//! # Responsibility
//! - Map scratch files of opened notes to the note and its editor buffer.
//! - Turn a saved buffer back into a note title and body.
//!
//! # Invariants
//! - A note id is tracked at most once; reopening switches to its buffer.
//! - `modified` reflects the buffer's dirty flag at the last pre-save event.
//! - Untracked or unmodified buffers never produce a note to save.

use crate::host::{BufferId, EditorHost, HostError, OptionScope, OptionValue};
use crate::model::note::Note;
use crate::scratch::{create_scratch_file, discard_scratch_file, NOTE_FILE_PREFIX};
use crate::store::{NoteStore, StoreError};
use log::{debug, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Body written for notes without content.
pub const PLACEHOLDER_BODY: &str = "<add content here>\n";
/// Buffer variable holding the title of the opened note.
pub const TITLE_OPTION: &str = "KeepTitle";
/// Row of the placeholder body in a freshly opened blank note.
const PLACEHOLDER_ROW: usize = 2;

#[derive(Debug)]
pub enum TrackerError {
    Store(StoreError),
    Host(HostError),
    /// Scratch file for the note could not be created.
    Scratch(std::io::Error),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
            Self::Scratch(err) => write!(f, "note scratch file: {err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Host(err) => Some(err),
            Self::Scratch(err) => Some(err),
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<HostError> for TrackerError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

/// One opened note.
#[derive(Debug, Clone)]
pub struct TrackedNote {
    pub note: Note,
    pub buffer: BufferId,
    pub modified: bool,
}

/// Opened notes keyed by the scratch file backing their buffer.
#[derive(Debug, Default)]
pub struct OpenNoteTracker {
    entries: BTreeMap<PathBuf, TrackedNote>,
}

impl OpenNoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Opens `note` in an editor buffer, or switches to it if already open.
    ///
    /// The note is reloaded from the store first so the buffer shows the
    /// remote body.
    pub fn open(
        &mut self,
        note: &Note,
        store: &dyn NoteStore,
        host: &mut dyn EditorHost,
    ) -> Result<BufferId, TrackerError> {
        if let Some(entry) = self.entry_for_note(&note.id) {
            let buffer = entry.buffer;
            host.switch_to_buffer(buffer);
            return Ok(buffer);
        }

        let note = store.get_note(&note.id)?;
        let blank = note.text.trim().is_empty();
        let mut contents = format!("{}\n\n", note.title);
        contents.push_str(if blank { PLACEHOLDER_BODY } else { &note.text });

        let path = create_scratch_file(NOTE_FILE_PREFIX, &contents).map_err(TrackerError::Scratch)?;
        let buffer = match host.edit_file(&path) {
            Ok(buffer) => buffer,
            Err(err) => {
                discard_scratch_file(&path);
                return Err(err.into());
            }
        };

        if blank {
            host.set_cursor_row(buffer, PLACEHOLDER_ROW);
        }
        host.set_option(
            buffer,
            OptionScope::Buffer,
            TITLE_OPTION,
            OptionValue::Text(note.title.clone()),
        );

        info!(
            "event=note_open module=tracker status=ok buffer={} blank={}",
            buffer, blank
        );
        self.entries.insert(
            path,
            TrackedNote {
                note,
                buffer,
                modified: false,
            },
        );
        Ok(buffer)
    }

    /// Records the buffer's dirty flag ahead of a save.
    ///
    /// Returns `false` when the buffer is not a tracked note.
    pub fn prepare_to_save(&mut self, buffer: BufferId, host: &dyn EditorHost) -> bool {
        match self.entry_for_buffer_mut(buffer) {
            Some(entry) => {
                entry.modified = host.is_buffer_modified(buffer);
                true
            }
            None => false,
        }
    }

    /// Copies a saved buffer's title and body onto its tracked note.
    ///
    /// Returns the updated note, or `None` when nothing needs to be stored.
    pub fn commit_changes_to_note(
        &mut self,
        buffer: BufferId,
        host: &dyn EditorHost,
    ) -> Option<Note> {
        let lines = host.buffer_lines(buffer);
        let entry = self.entry_for_buffer_mut(buffer)?;
        if !entry.modified {
            debug!("event=note_commit module=tracker status=skipped reason=unmodified");
            return None;
        }

        let (title, body) = extract_title_and_body(&lines, &entry.note.title);
        entry.note.title = title;
        entry.note.text = body;
        Some(entry.note.clone())
    }

    /// Stops tracking the note shown in `buffer` and removes its scratch file.
    pub fn close(&mut self, buffer: BufferId) -> Option<Note> {
        let path = self
            .entries
            .iter()
            .find(|(_, entry)| entry.buffer == buffer)
            .map(|(path, _)| path.clone())?;
        let entry = self.entries.remove(&path)?;
        discard_scratch_file(&path);
        debug!("event=note_close module=tracker status=ok buffer={buffer}");
        Some(entry.note)
    }

    /// Forgets every opened note, removing scratch files best-effort.
    pub fn close_all(&mut self) {
        for path in self.entries.keys() {
            discard_scratch_file(path);
        }
        self.entries.clear();
    }

    pub fn is_opened(&self, note_id: &str) -> bool {
        self.entry_for_note(note_id).is_some()
    }

    /// Whether the note was dirty at its last pre-save event.
    pub fn is_modified(&self, note_id: &str) -> bool {
        self.entry_for_note(note_id)
            .is_some_and(|entry| entry.modified)
    }

    /// Note shown in `buffer`, if it is tracked.
    pub fn open_note(&self, buffer: BufferId) -> Option<&Note> {
        self.entries
            .values()
            .find(|entry| entry.buffer == buffer)
            .map(|entry| &entry.note)
    }

    pub fn is_tracked(&self, buffer: BufferId) -> bool {
        self.open_note(buffer).is_some()
    }

    /// Scratch file backing the note's buffer.
    pub fn scratch_path(&self, note_id: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.note.id == note_id)
            .map(|(path, _)| path.as_path())
    }

    fn entry_for_note(&self, note_id: &str) -> Option<&TrackedNote> {
        self.entries.values().find(|entry| entry.note.id == note_id)
    }

    fn entry_for_buffer_mut(&mut self, buffer: BufferId) -> Option<&mut TrackedNote> {
        self.entries
            .values_mut()
            .find(|entry| entry.buffer == buffer)
    }
}

/// Splits buffer lines into a note title and body.
///
/// The first line (trimmed) is the title and blank lines after it are
/// skipped. Every remaining line is kept with a trailing newline. An empty
/// buffer keeps `fallback_title` and yields an empty body.
pub fn extract_title_and_body<S: AsRef<str>>(lines: &[S], fallback_title: &str) -> (String, String) {
    let Some((first, rest)) = lines.split_first() else {
        return (fallback_title.to_string(), String::new());
    };

    let title = first.as_ref().trim().to_string();
    let body = rest
        .iter()
        .map(AsRef::as_ref)
        .skip_while(|line| line.trim().is_empty())
        .fold(String::new(), |mut body, line| {
            body.push_str(line);
            body.push('\n');
            body
        });
    (title, body)
}
