//! Note and tag domain model.
//!
//! # Responsibility
//! - Define the local copies of remote notes and labels held by core.
//! - Derive the single-line display title used by the explorer.
//!
//! # Invariants
//! - `id` is assigned by the store and never changes for a note.
//! - A `Note` value always carries an id; drafts go through
//!   `NoteStore::create_note(title, text)`.

use serde::{Deserialize, Serialize};

/// Stable remote identifier of a note.
pub type NoteId = String;

/// Stable remote identifier of a label.
pub type TagId = String;

/// Maximum number of characters kept when a title falls back to the body.
pub const SUMMARY_MAX_CHARS: usize = 20;

/// Local copy of one remote note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Server-side identifier.
    pub id: NoteId,
    /// User-facing title. May be empty.
    pub title: String,
    /// Body text.
    pub text: String,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    /// Returns the title shown on one rendered line.
    ///
    /// Uses the first line of the title; when it is blank, falls back to the
    /// first line of the body truncated to `SUMMARY_MAX_CHARS` with a `..`
    /// suffix when truncated.
    pub fn display_title(&self) -> String {
        let title = first_line(&self.title);
        if !title.is_empty() {
            return title.to_string();
        }
        summarize(&self.text)
    }
}

/// Remote label used to group notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    pub fn new(id: impl Into<TagId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

fn first_line(value: &str) -> &str {
    value.trim().lines().next().unwrap_or("").trim()
}

fn summarize(text: &str) -> String {
    let line = first_line(text);
    let mut summary = line.chars().take(SUMMARY_MAX_CHARS).collect::<String>();
    if line.chars().count() > SUMMARY_MAX_CHARS {
        summary.push_str("..");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::Note;

    #[test]
    fn display_title_prefers_first_title_line() {
        let note = Note::new("n1", "  Groceries \nsecond", "milk");
        assert_eq!(note.display_title(), "Groceries");
    }

    #[test]
    fn display_title_falls_back_to_truncated_body() {
        let note = Note::new("n1", "", "\n  a rather long first line of text\nmore");
        assert_eq!(note.display_title(), "a rather long first ..");
    }

    #[test]
    fn display_title_keeps_short_body_untouched() {
        let note = Note::new("n1", "   ", "short body");
        assert_eq!(note.display_title(), "short body");
    }

    #[test]
    fn display_title_of_empty_note_is_empty() {
        let note = Note::new("n1", "", "");
        assert_eq!(note.display_title(), "");
    }
}
