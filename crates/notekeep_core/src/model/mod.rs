//! Domain model for remote notes and labels.
//!
//! # Responsibility
//! - Define the data carried between the store, the explorer tree and the
//!   open-note tracker.
//!
//! # Invariants
//! - Every note is identified by a stable store-assigned `NoteId`.
//! - Core holds copies; the store stays authoritative.

pub mod note;
