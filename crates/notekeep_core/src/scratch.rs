//! Scratch files backing editable buffers.
//!
//! # Invariants
//! - Scratch files outlive their handle; callers remove them explicitly.
//! - Removal failures are returned, never panicked on.

use log::{debug, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Prefix of the file backing the explorer buffer.
pub const EXPLORER_FILE_PREFIX: &str = "__KeepExplorer__";
/// Prefix of files backing opened notes.
pub const NOTE_FILE_PREFIX: &str = "__KeepNote__";

/// Creates a persistent temp file holding `contents` and returns its path.
pub fn create_scratch_file(prefix: &str, contents: &str) -> io::Result<PathBuf> {
    let mut file = tempfile::Builder::new().prefix(prefix).tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep()?;
    debug!("event=scratch_create module=scratch status=ok prefix={prefix}");
    Ok(path)
}

/// Removes one scratch file.
pub fn remove_scratch_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Removes one scratch file, logging and swallowing failures.
pub fn discard_scratch_file(path: &Path) {
    if let Err(err) = remove_scratch_file(path) {
        warn!(
            "event=scratch_remove module=scratch status=error path={} error={}",
            path.display(),
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{create_scratch_file, discard_scratch_file, remove_scratch_file};

    #[test]
    fn created_file_persists_until_removed() {
        let path = create_scratch_file("__test__", "hello\n").expect("create scratch");
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "hello\n");

        remove_scratch_file(&path).expect("remove scratch");
        assert!(!path.exists());
    }

    #[test]
    fn discarding_a_missing_file_is_silent() {
        let path = create_scratch_file("__test__", "").expect("create scratch");
        remove_scratch_file(&path).expect("first remove");
        discard_scratch_file(&path);
    }
}
