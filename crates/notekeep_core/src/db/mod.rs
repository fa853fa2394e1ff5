//! Local SQLite database behind `SqliteNoteStore`.
//!
//! # Responsibility
//! - Open note databases and bring their schema up to date.
//! - Report which migration or schema check failed.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A store only wraps connections whose version equals `latest_version()`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating a note database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Applying the migration to `version` failed; nothing was committed.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The database schema is not the one this build reads and writes.
    SchemaMismatch { found: u32, expected: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Migration { version, source } => {
                write!(f, "note schema migration {version} failed: {source}")
            }
            Self::SchemaMismatch { found, expected } if found > expected => write!(
                f,
                "note database schema {found} was written by a newer build (this build reads {expected})"
            ),
            Self::SchemaMismatch { found, expected } => write!(
                f,
                "note database schema {found} is not migrated (expected {expected})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
