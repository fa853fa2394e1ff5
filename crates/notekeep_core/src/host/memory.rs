//! In-process editor host.
//!
//! # Responsibility
//! - Back headless runs (the CLI) and tests with a buffer table.
//! - Record warnings, option writes and window widths for inspection.
//!
//! # Invariants
//! - Buffer ids are never reused.
//! - One buffer per named file.
//! - `write_buffer` persists lines to the buffer's file and clears the
//!   modified flag.

use super::{BufferId, EditorHost, HostError, HostResult, OptionScope, OptionValue};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_GUTTER_WIDTH: usize = 0;

/// State of one buffer held by `MemoryHost`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub modified: bool,
    pub cursor_row: Option<usize>,
    /// Whether a window currently shows the buffer.
    pub shown: bool,
    pub window_width: Option<usize>,
    pub options: BTreeMap<String, OptionValue>,
    pub write_count: usize,
}

/// Editor host that keeps every buffer in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    buffers: BTreeMap<BufferId, MemoryBuffer>,
    globals: HashMap<String, String>,
    warnings: Vec<String>,
    gutter_width: usize,
    next_id: u64,
    fail_writes: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            gutter_width: DEFAULT_GUTTER_WIDTH,
            ..Self::default()
        }
    }

    pub fn set_global(&mut self, name: &str, value: &str) {
        self.globals.insert(name.to_string(), value.to_string());
    }

    pub fn set_gutter_width(&mut self, width: usize) {
        self.gutter_width = width;
    }

    /// Makes every following `write_buffer` fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn buffer(&self, buffer: BufferId) -> Option<&MemoryBuffer> {
        self.buffers.get(&buffer)
    }

    pub fn buffer_for_path(&self, path: &Path) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|(_, state)| state.path == path)
            .map(|(id, _)| *id)
    }

    /// Replaces buffer lines the way a user edit would, marking it modified.
    pub fn type_lines(&mut self, buffer: BufferId, lines: &[&str]) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.lines = lines.iter().map(|line| line.to_string()).collect();
            state.modified = true;
        }
    }

    /// Replaces one line the way a user edit would.
    pub fn type_line(&mut self, buffer: BufferId, row: usize, line: &str) {
        let Some(state) = self.buffers.get_mut(&buffer) else {
            return;
        };
        if let Some(slot) = state.lines.get_mut(row) {
            *slot = line.to_string();
            state.modified = true;
        }
    }

    /// Adds an unnamed buffer holding `lines`.
    pub fn add_scratch_buffer(&mut self, lines: &[&str]) -> BufferId {
        let id = self.allocate(PathBuf::new(), Vec::new());
        self.type_lines(id, lines);
        id
    }

    /// Warnings shown so far, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn allocate(&mut self, path: PathBuf, lines: Vec<String>) -> BufferId {
        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.buffers.insert(
            id,
            MemoryBuffer {
                path,
                lines,
                shown: true,
                ..MemoryBuffer::default()
            },
        );
        id
    }

    fn load(&mut self, path: &Path) -> HostResult<BufferId> {
        if let Some(id) = self.buffer_for_path(path) {
            if let Some(state) = self.buffers.get_mut(&id) {
                state.shown = true;
            }
            return Ok(id);
        }

        let contents = fs::read_to_string(path)
            .map_err(|err| HostError::new(format!("cannot read {}: {err}", path.display())))?;
        let lines = contents.lines().map(str::to_string).collect();
        let id = self.allocate(path.to_path_buf(), lines);
        debug!("event=buffer_load module=host.memory status=ok buffer={id}");
        Ok(id)
    }

    fn state_mut(&mut self, buffer: BufferId) -> HostResult<&mut MemoryBuffer> {
        self.buffers
            .get_mut(&buffer)
            .ok_or_else(|| HostError::new(format!("unknown buffer {buffer}")))
    }
}

impl EditorHost for MemoryHost {
    fn buffer_lines(&self, buffer: BufferId) -> Vec<String> {
        self.buffers
            .get(&buffer)
            .map(|state| state.lines.clone())
            .unwrap_or_default()
    }

    fn set_buffer_lines(&mut self, buffer: BufferId, lines: &[String]) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.lines = lines.to_vec();
            state.modified = true;
        }
    }

    fn is_buffer_modified(&self, buffer: BufferId) -> bool {
        self.buffers.get(&buffer).is_some_and(|state| state.modified)
    }

    fn write_buffer(&mut self, buffer: BufferId) -> HostResult<()> {
        if self.fail_writes {
            return Err(HostError::new("writes are disabled"));
        }
        let state = self.state_mut(buffer)?;
        if !state.path.as_os_str().is_empty() {
            let mut contents = state.lines.join("\n");
            contents.push('\n');
            fs::write(&state.path, contents).map_err(|err| {
                HostError::new(format!("cannot write {}: {err}", state.path.display()))
            })?;
        }
        state.modified = false;
        state.write_count += 1;
        Ok(())
    }

    fn cursor_row(&self, buffer: BufferId) -> Option<usize> {
        self.buffers.get(&buffer).and_then(|state| state.cursor_row)
    }

    fn set_cursor_row(&mut self, buffer: BufferId, row: usize) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.cursor_row = Some(row);
        }
    }

    fn open_side_window(&mut self, path: &Path) -> HostResult<BufferId> {
        self.load(path)
    }

    fn edit_file(&mut self, path: &Path) -> HostResult<BufferId> {
        self.load(path)
    }

    fn switch_to_buffer(&mut self, buffer: BufferId) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.shown = true;
        }
    }

    fn hide_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn resize_window(&mut self, buffer: BufferId, width: usize) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.window_width = Some(width);
        }
    }

    fn gutter_width(&self, _buffer: BufferId) -> usize {
        self.gutter_width
    }

    fn set_option(&mut self, buffer: BufferId, _scope: OptionScope, name: &str, value: OptionValue) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.options.insert(name.to_string(), value);
        }
    }

    fn global_setting(&self, name: &str) -> Option<String> {
        self.globals.get(name).cloned()
    }

    fn show_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryHost;
    use crate::host::EditorHost;

    #[test]
    fn write_persists_lines_and_clears_modified() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("buffer.txt");
        std::fs::write(&path, "first\n").expect("seed file");

        let mut host = MemoryHost::new();
        let buffer = host.edit_file(&path).expect("edit file");
        assert_eq!(host.buffer_lines(buffer), vec!["first".to_string()]);

        host.type_lines(buffer, &["changed", "lines"]);
        assert!(host.is_buffer_modified(buffer));
        host.write_buffer(buffer).expect("write");

        assert!(!host.is_buffer_modified(buffer));
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "changed\nlines\n"
        );
    }

    #[test]
    fn same_path_reuses_buffer() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "").expect("seed file");

        let mut host = MemoryHost::new();
        let first = host.edit_file(&path).expect("first edit");
        let second = host.open_side_window(&path).expect("second edit");
        assert_eq!(first, second);
    }

    #[test]
    fn hidden_buffer_is_unloaded() {
        let mut host = MemoryHost::new();
        let buffer = host.add_scratch_buffer(&["a"]);
        host.hide_buffer(buffer);
        assert!(host.buffer(buffer).is_none());
        assert!(host.buffer_lines(buffer).is_empty());
    }
}
