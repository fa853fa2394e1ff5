//! Note store contracts and adapters.
//!
//! # Responsibility
//! - Define the request/response contract core uses to talk to the note
//!   service (`NoteStore`).
//! - Ship deterministic in-memory and SQLite-backed adapters.
//!
//! # Invariants
//! - Every call either completes or returns `StoreError`; core never retries.
//! - `update_note` replaces title and text of the stored note with the given id
//!   and leaves every other stored field untouched.

use crate::db::DbError;
use crate::model::note::{Note, NoteId, Tag};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryNoteStore;
pub use sqlite::SqliteNoteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by note store adapters.
#[derive(Debug)]
pub enum StoreError {
    /// No note exists with the given id.
    NotFound(NoteId),
    /// The service refused or failed the request.
    Unavailable(String),
    /// Local SQLite failure.
    Db(DbError),
    /// Stored data cannot be converted into the domain model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Unavailable(message) => write!(f, "note service unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid note data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Unavailable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filters accepted by `NoteStore::list_notes`.
///
/// `None` means "do not filter on this field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteFilter {
    /// Case-insensitive words matched against title or text.
    pub search_words: Option<String>,
    /// Label names; a note matches when it carries any of them.
    pub labels: Option<Vec<String>>,
    /// Color names; a note matches when its color is listed.
    pub colors: Option<Vec<String>>,
    pub archived: Option<bool>,
    pub trashed: Option<bool>,
    pub pinned: Option<bool>,
}

impl NoteFilter {
    /// Notes carrying the given label.
    pub fn labeled(name: impl Into<String>) -> Self {
        Self {
            labels: Some(vec![name.into()]),
            trashed: Some(false),
            ..Self::default()
        }
    }

    /// Notes shown in the explorer's top-level listing.
    pub fn unlabeled_listing() -> Self {
        Self {
            archived: Some(false),
            trashed: Some(false),
            pinned: Some(false),
            ..Self::default()
        }
    }

    /// Full-text search over live notes.
    pub fn search(words: impl Into<String>) -> Self {
        Self {
            search_words: Some(words.into()),
            trashed: Some(false),
            ..Self::default()
        }
    }
}

/// Per-note flags a store keeps beside title and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFlags {
    pub color: Option<String>,
    pub archived: bool,
    pub trashed: bool,
    pub pinned: bool,
}

impl NoteFlags {
    pub(crate) fn matches(&self, filter: &NoteFilter) -> bool {
        if let Some(archived) = filter.archived {
            if self.archived != archived {
                return false;
            }
        }
        if let Some(trashed) = filter.trashed {
            if self.trashed != trashed {
                return false;
            }
        }
        if let Some(pinned) = filter.pinned {
            if self.pinned != pinned {
                return false;
            }
        }
        if let Some(colors) = filter.colors.as_ref() {
            let Some(color) = self.color.as_deref() else {
                return false;
            };
            if !colors.iter().any(|value| value.eq_ignore_ascii_case(color)) {
                return false;
            }
        }
        true
    }
}

/// Request/response contract for the note service.
///
/// All calls are synchronous; a slow service stalls the caller.
pub trait NoteStore {
    /// Creates one note and returns it with its assigned id.
    fn create_note(&self, title: &str, text: &str) -> StoreResult<Note>;
    /// Reloads one note in full.
    fn get_note(&self, id: &str) -> StoreResult<Note>;
    /// Replaces title and text of the stored note with `note.id`.
    fn update_note(&self, note: &Note) -> StoreResult<()>;
    /// Lists notes matching every set field of `filter`.
    fn list_notes(&self, filter: &NoteFilter) -> StoreResult<Vec<Note>>;
    /// Counts every stored note, including archived and trashed ones.
    fn count_all(&self) -> StoreResult<usize>;
    /// Lists every known label.
    fn list_labels(&self) -> StoreResult<Vec<Tag>>;
    /// Replaces the label set of one note, creating unknown labels.
    fn set_note_labels(&self, id: &str, names: &[String]) -> StoreResult<()>;
}

/// Case-insensitive word match used by store adapters.
pub(crate) fn matches_search_words(note: &Note, words: &str) -> bool {
    let title = note.title.to_lowercase();
    let text = note.text.to_lowercase();
    words
        .split_whitespace()
        .map(str::to_lowercase)
        .all(|word| title.contains(&word) || text.contains(&word))
}
