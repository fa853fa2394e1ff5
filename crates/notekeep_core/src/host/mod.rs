//! Host editor capability surface.
//!
//! # Responsibility
//! - Describe the buffer, window and option operations core needs from the
//!   editor that embeds it.
//! - Keep core independent of any particular editor.
//!
//! # Invariants
//! - Line and row indices are 0-based.
//! - `write_buffer` persists a buffer without invoking the pre-save event, so
//!   only user-initiated saves reach `Session::on_before_save`.

pub mod memory;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub use memory::MemoryHost;

/// Opaque editor buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

impl Display for BufferId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Failure reported by the host editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "editor host error: {}", self.message)
    }
}

impl Error for HostError {}

/// Scope of an editor option write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    Window,
    Buffer,
}

/// Value of an editor option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

/// Operations core performs against the embedding editor.
pub trait EditorHost {
    /// Returns every line of a buffer.
    fn buffer_lines(&self, buffer: BufferId) -> Vec<String>;
    /// Replaces every line of a buffer.
    fn set_buffer_lines(&mut self, buffer: BufferId, lines: &[String]);
    /// Whether the buffer has edits not yet written.
    fn is_buffer_modified(&self, buffer: BufferId) -> bool;
    /// Writes a buffer to its file without firing the pre-save event.
    fn write_buffer(&mut self, buffer: BufferId) -> HostResult<()>;

    /// Row of the cursor in the window showing `buffer`, if any.
    fn cursor_row(&self, buffer: BufferId) -> Option<usize>;
    fn set_cursor_row(&mut self, buffer: BufferId, row: usize);

    /// Opens `path` in a new window split on the left edge and returns its buffer.
    fn open_side_window(&mut self, path: &Path) -> HostResult<BufferId>;
    /// Edits `path` in the first usable window, creating one if needed.
    fn edit_file(&mut self, path: &Path) -> HostResult<BufferId>;
    /// Shows an already loaded buffer in the first usable window.
    fn switch_to_buffer(&mut self, buffer: BufferId);
    /// Closes every window showing `buffer` and unloads it, keeping its file.
    fn hide_buffer(&mut self, buffer: BufferId);
    /// Sets the width of the window showing `buffer`.
    fn resize_window(&mut self, buffer: BufferId, width: usize);
    /// Columns used by line numbers and fold markers in front of the text.
    fn gutter_width(&self, buffer: BufferId) -> usize;

    fn set_option(&mut self, buffer: BufferId, scope: OptionScope, name: &str, value: OptionValue);
    /// Reads a user-level setting, e.g. a global editor variable.
    fn global_setting(&self, name: &str) -> Option<String>;

    /// Shows a message the user has to acknowledge.
    fn show_warning(&mut self, message: &str);
}
