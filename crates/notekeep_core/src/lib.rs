//! Core of the notekeep editor explorer.
//!
//! Renders remote notes and labels as an editable text tree, turns edits of
//! that text back into store updates, and tracks notes opened for editing.

pub mod db;
pub mod explorer;
pub mod host;
pub mod logging;
pub mod model;
pub mod scratch;
pub mod session;
pub mod store;
pub mod tracker;
pub mod tree;

pub use explorer::config::ExplorerConfig;
pub use explorer::{Activation, CommitSummary, Explorer, ExplorerError};
pub use host::{BufferId, EditorHost, HostError, HostResult, MemoryHost, OptionScope, OptionValue};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteId, Tag, TagId};
pub use session::{Session, SessionError, SessionResult};
pub use store::{
    MemoryNoteStore, NoteFilter, NoteFlags, NoteStore, SqliteNoteStore, StoreError, StoreResult,
};
pub use tracker::{extract_title_and_body, OpenNoteTracker, TrackerError};
pub use tree::change::{Change, ChangeFailure};
pub use tree::registry::NodeKey;
pub use tree::{NodeArena, NodeId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
