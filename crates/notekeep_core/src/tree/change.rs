//! Deferred mutations detected by diffing the explorer buffer.
//!
//! # Invariants
//! - A change is applied at most once; its owner clears it right after.
//! - Applying writes the local note first, then the store. A store failure
//!   leaves both sides diverged and is reported, never retried.

use crate::model::note::{Note, NoteId};
use crate::store::{NoteStore, StoreError, StoreResult};
use crate::tree::registry::NodeKey;
use log::{info, warn};
use std::fmt::{Display, Formatter};

/// One deferred mutation recorded on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The user edited a note title in the explorer buffer.
    Rename { note_id: NoteId, new_title: String },
}

impl Change {
    /// Applies the change to the local note and pushes it to the store.
    pub fn apply(&self, note: &mut Note, store: &dyn NoteStore) -> StoreResult<()> {
        match self {
            Self::Rename { note_id, new_title } => {
                note.title = new_title.clone();

                let mut remote = store.get_note(note_id)?;
                remote.title = new_title.clone();
                store.update_note(&remote)?;
                info!("event=note_rename module=tree.change status=ok");
                Ok(())
            }
        }
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rename { note_id, .. } => write!(f, "rename of note {note_id}"),
        }
    }
}

/// A change whose store update failed.
#[derive(Debug)]
pub struct ChangeFailure {
    /// Key of the node the change was recorded on.
    pub key: NodeKey,
    pub change: Change,
    pub error: StoreError,
}

impl ChangeFailure {
    pub(crate) fn new(key: NodeKey, change: Change, error: StoreError) -> Self {
        warn!(
            "event=change_apply module=tree.change status=error key={} error={}",
            key, error
        );
        Self { key, change, error }
    }
}

impl Display for ChangeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.change, self.error)
    }
}
