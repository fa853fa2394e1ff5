//! Headless explorer preview.
//!
//! # Responsibility
//! - Render the explorer for a SQLite note database (or a built-in sample)
//!   through the in-memory host and print it.
//!
//! Usage: `notekeep_cli [DB_PATH]`
//!
//! Logs go to `$NOTEKEEP_LOG_DIR`, or `notekeep-logs` under the system temp
//! directory.

use log::info;
use notekeep_core::db::open_db;
use notekeep_core::{
    default_log_level, init_logging, logging_status, EditorHost, ExplorerConfig, MemoryHost,
    MemoryNoteStore, Note, NoteFlags, NoteStore, Session, SqliteNoteStore, StoreError,
};
use std::error::Error;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "NOTEKEEP_LOG_DIR";

fn main() -> ExitCode {
    let log_dir = log_dir_from(std::env::var_os(LOG_DIR_ENV));
    // Logging failures do not stop the preview.
    if let Err(err) = init_logging(default_log_level(), &log_dir.to_string_lossy()) {
        eprintln!("notekeep: logging disabled: {err}");
    }
    if let Some((level, dir)) = logging_status() {
        info!(
            "event=cli_start module=cli status=ok level={} log_dir={}",
            level,
            dir.display()
        );
    }

    let db_path = std::env::args().nth(1);
    let result = match db_path {
        Some(path) => open_sqlite(&path).and_then(preview),
        None => sample_store()
            .map_err(Box::<dyn Error>::from)
            .and_then(preview),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("notekeep: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_sqlite(path: &str) -> Result<SqliteNoteStore, Box<dyn Error>> {
    let conn = open_db(path)?;
    Ok(SqliteNoteStore::try_new(conn)?)
}

fn log_dir_from(configured: Option<OsString>) -> PathBuf {
    match configured {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("notekeep-logs"),
    }
}

fn sample_store() -> Result<MemoryNoteStore, StoreError> {
    let store = MemoryNoteStore::new();
    store.insert_label("label-work", "Work");
    store.insert_label("label-home", "home");
    store.insert_note(
        Note::new("note-plan", "Quarter plan", "- hiring\n- roadmap\n"),
        NoteFlags::default(),
    );
    store.insert_note(
        Note::new("note-shopping", "", "milk, eggs, coffee beans and bread\n"),
        NoteFlags::default(),
    );
    store.set_note_labels("note-plan", &["Work".to_string()])?;
    Ok(store)
}

fn preview<S: NoteStore>(store: S) -> Result<(), Box<dyn Error>> {
    let mut session = Session::new(store, MemoryHost::new(), ExplorerConfig::default())?;
    session.toggle_explorer()?;

    let buffer = session
        .explorer()
        .buffer()
        .ok_or("explorer buffer was not opened")?;
    let first_tag_row = session
        .explorer()
        .tags()
        .first()
        .and_then(|id| session.explorer().node(*id))
        .and_then(|node| node.row());
    if let Some(row) = first_tag_row {
        session.activate_node(row)?;
    }

    for line in session.host().buffer_lines(buffer) {
        println!("{line}");
    }
    info!(
        "event=cli_preview module=cli status=ok note_count={}",
        session.explorer().note_count()
    );
    session.terminate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{log_dir_from, sample_store};
    use notekeep_core::{NoteFilter, NoteStore};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn log_dir_prefers_the_configured_directory() {
        assert_eq!(
            log_dir_from(Some(OsString::from("/var/log/notekeep"))),
            PathBuf::from("/var/log/notekeep")
        );
        let fallback = std::env::temp_dir().join("notekeep-logs");
        assert_eq!(log_dir_from(None), fallback);
        assert_eq!(log_dir_from(Some(OsString::new())), fallback);
    }

    #[test]
    fn sample_store_labels_the_plan() {
        let store = sample_store().expect("sample store");
        let labeled = store
            .list_notes(&NoteFilter::labeled("Work"))
            .expect("list work notes");
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].id, "note-plan");
    }
}
