//! Explorer: tree ⇄ text reconciliation.
//!
//! # Responsibility
//! - Own the top-level forest (notes, tags, search results) of one model build.
//! - Render the forest into the explorer buffer.
//! - Re-derive user edits from the buffer and commit them to the store.
//!
//! # Invariants
//! - A render never overwrites unsaved buffer edits before diffing them.
//! - Rendering is idempotent while model and buffer are unchanged.
//! - After a commit every other instance of a committed note shows its new
//!   title.
//! - Refresh rebuilds the whole model; expanded tags stay expanded when their
//!   key still exists.
//! - A keyed line is diffed only when its text differs from the last rendered
//!   or diffed text for that key.
//! - Search results are reloaded from the store on refresh.

pub mod config;

use crate::host::{BufferId, EditorHost, HostError, OptionScope, OptionValue};
use crate::model::note::{Note, NoteId};
use crate::scratch::{create_scratch_file, discard_scratch_file, EXPLORER_FILE_PREFIX};
use crate::store::{NoteFilter, NoteStore, StoreError};
use crate::tree::change::ChangeFailure;
use crate::tree::line::extract_key;
use crate::tree::registry::NodeKey;
use crate::tree::{Glyphs, Node, NodeArena, NodeId, NodeKind, RenderAttribs};
use config::ExplorerConfig;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Extra separator columns beyond the key column.
const SEPARATOR_EXTRA: usize = 41;

const NOTES_HEADER: &str = "Notes:";
const TAGS_HEADER: &str = "Tags:";
const SEARCH_HEADER: &str = "Search Results:";

/// Errors from explorer operations.
#[derive(Debug)]
pub enum ExplorerError {
    Store(StoreError),
    Host(HostError),
    /// Backing scratch file could not be created.
    Scratch(std::io::Error),
    /// Some committed changes could not be pushed to the store.
    CommitFailed(Vec<ChangeFailure>),
}

impl Display for ExplorerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
            Self::Scratch(err) => write!(f, "explorer scratch file: {err}"),
            Self::CommitFailed(failures) => {
                write!(f, "{} change(s) failed to commit", failures.len())?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ExplorerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Host(err) => Some(err),
            Self::Scratch(err) => Some(err),
            Self::CommitFailed(failures) => failures
                .first()
                .map(|failure| &failure.error as &(dyn Error + 'static)),
        }
    }
}

impl From<StoreError> for ExplorerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<HostError> for ExplorerError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Nodes whose pending changes were applied.
    pub committed_nodes: usize,
    /// Other instances of committed notes that were reloaded.
    pub refreshed_duplicates: usize,
}

/// Result of activating the node under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A note line was activated; the caller opens the note.
    OpenNote(Note),
    /// A tag was expanded or collapsed.
    Toggled { expanded: bool },
}

/// Navigation tree of notes and tags rendered into one buffer.
#[derive(Debug)]
pub struct Explorer {
    config: ExplorerConfig,
    glyphs: Glyphs,
    arena: NodeArena,
    notes: Vec<NodeId>,
    tags: Vec<NodeId>,
    search_results: Vec<NodeId>,
    search_ids: Vec<NoteId>,
    modified: Vec<NodeId>,
    /// Keyed line text as last rendered or diffed.
    seen_lines: HashMap<String, String>,
    expand_state: BTreeMap<NodeKey, bool>,
    selected: Option<NodeKey>,
    buffer: Option<BufferId>,
    data_file: Option<PathBuf>,
    hidden: bool,
    note_count: usize,
}

impl Explorer {
    /// Creates an empty, hidden explorer.
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            glyphs: config.glyphs(),
            config,
            arena: NodeArena::new(),
            notes: Vec::new(),
            tags: Vec::new(),
            search_results: Vec::new(),
            search_ids: Vec::new(),
            modified: Vec::new(),
            seen_lines: HashMap::new(),
            expand_state: BTreeMap::new(),
            selected: None,
            buffer: None,
            data_file: None,
            hidden: true,
            note_count: 0,
        }
    }

    /// Creates an explorer and loads its model from the store.
    pub fn load(config: ExplorerConfig, store: &dyn NoteStore) -> Result<Self, ExplorerError> {
        let mut explorer = Self::new(config);
        explorer.refresh(store)?;
        Ok(explorer)
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Resolves a render key to a live node.
    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.arena.lookup(key)
    }

    pub fn notes(&self) -> &[NodeId] {
        &self.notes
    }

    pub fn tags(&self) -> &[NodeId] {
        &self.tags
    }

    pub fn search_results(&self) -> &[NodeId] {
        &self.search_results
    }

    /// Nodes with detected but uncommitted changes.
    pub fn pending_nodes(&self) -> &[NodeId] {
        &self.modified
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Whether the explorer buffer is currently not shown in any window.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Total number of notes in the store at the last refresh.
    pub fn note_count(&self) -> usize {
        self.note_count
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// Rebuilds the whole model from the store.
    ///
    /// Store data is fetched before the old model is dropped, so a failed
    /// refresh leaves the previous model in place.
    pub fn refresh(&mut self, store: &dyn NoteStore) -> Result<(), ExplorerError> {
        let note_count = store.count_all()?;
        let mut tags = store.list_labels()?;
        tags.sort_by_key(|tag| tag.name.to_lowercase());
        let notes = store.list_notes(&NoteFilter::unlabeled_listing())?;
        let mut found = Vec::with_capacity(self.search_ids.len());
        for note_id in &self.search_ids {
            match store.get_note(note_id) {
                Ok(note) => found.push(note),
                Err(StoreError::NotFound(_)) => debug!(
                    "event=explorer_refresh module=explorer status=search_result_gone note_id={}",
                    note_id
                ),
                Err(err) => return Err(err.into()),
            }
        }

        if !self.arena.is_empty() {
            self.expand_state = self.arena.expand_state();
        }
        if !self.modified.is_empty() {
            warn!(
                "event=explorer_refresh module=explorer status=discarding pending_nodes={}",
                self.modified.len()
            );
            self.modified.clear();
        }

        self.arena.clear();
        self.tags.clear();
        self.notes.clear();
        self.search_results.clear();

        for tag in tags {
            let id = self.arena.add_tag(tag, 0);
            self.tags.push(id);
        }
        for note in notes {
            let id = self.arena.add_note(note, 0, None);
            self.notes.push(id);
        }
        self.search_ids = found.iter().map(|note| note.id.clone()).collect();
        for note in found {
            let id = self.arena.add_note(note, 0, None);
            self.search_results.push(id);
        }
        self.note_count = note_count;

        self.arena.restore_expand_state(&self.expand_state, store);
        info!(
            "event=explorer_refresh module=explorer status=ok tag_count={} note_count={} node_count={}",
            self.tags.len(),
            self.notes.len(),
            self.arena.len()
        );
        Ok(())
    }

    /// Renders the forest into the explorer buffer.
    ///
    /// Unsaved user edits are diffed into pending changes first.
    pub fn render(&mut self, host: &mut dyn EditorHost) -> Result<(), ExplorerError> {
        let Some(buffer) = self.buffer else {
            return Ok(());
        };
        if self.hidden {
            return Ok(());
        }

        if host.is_buffer_modified(buffer) {
            self.apply_changes(host);
        }

        self.arena.reset_rows();
        self.arena.measure_all(&self.glyphs);
        let attribs = RenderAttribs {
            key_col: self.arena.max_preferred_width() + 1,
            glyphs: &self.glyphs,
        };
        let separator = "=".repeat(attribs.key_col + SEPARATOR_EXTRA);

        let mut content = Vec::new();
        for (header, section) in [
            (NOTES_HEADER, &self.notes),
            (TAGS_HEADER, &self.tags),
            (SEARCH_HEADER, &self.search_results),
        ] {
            if section.is_empty() {
                continue;
            }
            content.push(String::new());
            content.push(header.to_string());
            content.push(separator.clone());
            for &id in section {
                self.arena.render(id, &mut content, &attribs);
            }
        }

        host.set_buffer_lines(buffer, &content);
        self.seen_lines = content
            .iter()
            .filter_map(|line| extract_key(line).map(|key| (key.to_string(), line.clone())))
            .collect();

        if let Some(row) = self
            .selected
            .as_ref()
            .and_then(|key| self.arena.lookup(key.as_str()))
            .and_then(|id| self.arena.get(id))
            .and_then(Node::row)
        {
            host.set_cursor_row(buffer, row);
        }

        let width = self.config.window_width(self.required_width(host));
        host.resize_window(buffer, width);
        host.write_buffer(buffer)?;
        debug!(
            "event=explorer_render module=explorer status=ok line_count={}",
            content.len()
        );
        Ok(())
    }

    /// Widest keyed line in the explorer buffer plus the host gutter.
    ///
    /// Zero while the explorer has no buffer.
    pub fn required_width(&self, host: &dyn EditorHost) -> usize {
        let Some(buffer) = self.buffer else {
            return 0;
        };
        let widest = host
            .buffer_lines(buffer)
            .iter()
            .filter(|line| extract_key(line).is_some())
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        widest + host.gutter_width(buffer)
    }

    /// Diffs the buffer against the model and queues nodes with changes.
    ///
    /// Returns the number of changes detected by this pass.
    pub fn apply_changes(&mut self, host: &dyn EditorHost) -> usize {
        let Some(buffer) = self.buffer else {
            return 0;
        };
        let lines = host.buffer_lines(buffer);

        // Lines may have been moved since the last render.
        self.arena.reset_rows();
        for (row, line) in lines.iter().enumerate() {
            if let Some(id) = extract_key(line).and_then(|key| self.arena.lookup(key)) {
                self.arena.set_row(id, row);
            }
        }

        let mut detected = 0;
        for id in self.arena.ids().collect::<Vec<_>>() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let Some(row) = node.row() else {
                continue;
            };
            let line = &lines[row];
            if self.seen_lines.get(node.key().as_str()) == Some(line) {
                continue;
            }
            if self.arena.adapt(id, line) {
                detected += 1;
                if !self.modified.contains(&id) {
                    self.modified.push(id);
                }
            }
        }

        for line in &lines {
            if let Some(key) = extract_key(line) {
                self.seen_lines.insert(key.to_string(), line.clone());
            }
        }

        if detected > 0 {
            info!(
                "event=explorer_diff module=explorer status=ok change_count={} pending_nodes={}",
                detected,
                self.modified.len()
            );
        }
        detected
    }

    /// Commits every queued node and refreshes other instances of the same notes.
    pub fn commit_changes(
        &mut self,
        host: &dyn EditorHost,
        store: &dyn NoteStore,
    ) -> Result<CommitSummary, ExplorerError> {
        if let Some(buffer) = self.buffer {
            if host.is_buffer_modified(buffer) {
                self.apply_changes(host);
            }
        }

        let queued = std::mem::take(&mut self.modified);
        let mut failures = Vec::new();
        for &id in &queued {
            failures.extend(self.arena.commit_changes(id, store));
        }

        let mut refreshed = 0;
        for &id in &queued {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let source = node.as_note().map(|note| note.note.clone());
            let duplicates = self
                .arena
                .registry()
                .instances_of(node.object_id())
                .iter()
                .copied()
                .filter(|other| *other != id)
                .collect::<Vec<_>>();

            for duplicate in duplicates {
                match self.arena.refresh(duplicate, store) {
                    Ok(()) => refreshed += 1,
                    Err(err) => {
                        warn!(
                            "event=duplicate_refresh module=explorer status=error error={}",
                            err
                        );
                        if let Some(source) = source.as_ref() {
                            self.arena.mirror_note(duplicate, source);
                        }
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(ExplorerError::CommitFailed(failures));
        }
        if !queued.is_empty() {
            info!(
                "event=explorer_commit module=explorer status=ok committed_nodes={} refreshed_duplicates={}",
                queued.len(),
                refreshed
            );
        }
        Ok(CommitSummary {
            committed_nodes: queued.len(),
            refreshed_duplicates: refreshed,
        })
    }

    /// Reloads every instance of `note_id` from the store.
    ///
    /// Returns the number of reloaded nodes.
    pub fn reload_note(
        &mut self,
        store: &dyn NoteStore,
        note_id: &str,
    ) -> Result<usize, ExplorerError> {
        let instances = self.arena.registry().instances_of(note_id).to_vec();
        for &id in &instances {
            self.arena.refresh(id, store)?;
        }
        if !instances.is_empty() {
            debug!(
                "event=explorer_reload_note module=explorer status=ok note_id={} instance_count={}",
                note_id,
                instances.len()
            );
        }
        Ok(instances.len())
    }

    /// Opens the explorer buffer in a side window and renders it.
    pub fn show(&mut self, host: &mut dyn EditorHost) -> Result<(), ExplorerError> {
        let path = match self.data_file.as_ref() {
            Some(path) => path.clone(),
            None => {
                let path = create_scratch_file(EXPLORER_FILE_PREFIX, "")
                    .map_err(ExplorerError::Scratch)?;
                self.data_file = Some(path.clone());
                path
            }
        };

        let buffer = host.open_side_window(&path)?;
        host.set_option(buffer, OptionScope::Window, "winfixwidth", OptionValue::Bool(true));
        host.set_option(buffer, OptionScope::Window, "wrap", OptionValue::Bool(false));
        host.set_option(buffer, OptionScope::Window, "cursorline", OptionValue::Bool(true));
        host.set_option(buffer, OptionScope::Buffer, "swapfile", OptionValue::Bool(false));
        host.set_option(
            buffer,
            OptionScope::Buffer,
            "bufhidden",
            OptionValue::Text("hide".to_string()),
        );
        host.set_option(
            buffer,
            OptionScope::Buffer,
            "filetype",
            OptionValue::Text("notekeep".to_string()),
        );

        self.buffer = Some(buffer);
        self.hidden = false;
        self.render(host)
    }

    /// Closes the explorer window, keeping model and backing file.
    pub fn hide(&mut self, host: &mut dyn EditorHost) {
        if let Some(buffer) = self.buffer {
            host.hide_buffer(buffer);
        }
        self.hidden = true;
    }

    /// Toggles the node shown on `row` and re-renders, keeping the cursor.
    pub fn activate_node(
        &mut self,
        host: &mut dyn EditorHost,
        store: &dyn NoteStore,
        row: usize,
    ) -> Result<Option<Activation>, ExplorerError> {
        let Some(buffer) = self.buffer else {
            return Ok(None);
        };
        let Some(id) = self.node_at_row(host, buffer, row) else {
            return Ok(None);
        };

        let expanded = self.arena.toggle(id, store)?;
        let activation = match self.arena.get(id).map(Node::kind) {
            Some(NodeKind::Note(note)) => Activation::OpenNote(note.note.clone()),
            _ => Activation::Toggled { expanded },
        };

        self.render(host)?;
        host.set_cursor_row(buffer, row);
        Ok(Some(activation))
    }

    /// Appends a node for a note that already exists in the store.
    pub fn add_note(&mut self, note: Note) -> NodeId {
        let id = self.arena.add_note(note, 0, None);
        self.notes.push(id);
        id
    }

    /// Replaces search results with notes matching `words`.
    pub fn search(&mut self, store: &dyn NoteStore, words: &str) -> Result<usize, ExplorerError> {
        let found = store.list_notes(&NoteFilter::search(words))?;
        self.clear_search_results();
        for note in found {
            self.search_ids.push(note.id.clone());
            let id = self.arena.add_note(note, 0, None);
            self.search_results.push(id);
        }
        debug!(
            "event=explorer_search module=explorer status=ok result_count={}",
            self.search_results.len()
        );
        Ok(self.search_results.len())
    }

    pub fn clear_search_results(&mut self) {
        self.search_results.clear();
        self.search_ids.clear();
    }

    /// Node under the cursor of the explorer window.
    pub fn selected_node(&self, host: &dyn EditorHost) -> Option<NodeId> {
        let buffer = self.buffer?;
        let row = host.cursor_row(buffer)?;
        self.node_at_row(host, buffer, row)
    }

    /// Remembers `key` as selected and moves the cursor onto it if rendered.
    pub fn select_node(&mut self, host: &mut dyn EditorHost, key: NodeKey) {
        let row = self
            .arena
            .lookup(key.as_str())
            .and_then(|id| self.arena.get(id))
            .and_then(Node::row);
        if let (Some(buffer), Some(row)) = (self.buffer, row) {
            host.set_cursor_row(buffer, row);
        }
        self.selected = Some(key);
    }

    /// Nearest tag line above a note line.
    pub fn node_parent(&self, host: &dyn EditorHost, row: usize) -> Option<NodeId> {
        let buffer = self.buffer?;
        let lines = host.buffer_lines(buffer);
        let start = self.key_node(lines.get(row)?)?;
        if !self.arena.get(start)?.is_note() {
            return None;
        }

        lines[..=row]
            .iter()
            .rev()
            .filter_map(|line| self.key_node(line))
            .find(|id| self.arena.get(*id).is_some_and(|node| !node.is_note()))
    }

    /// Removes the explorer's backing file; failures are logged only.
    pub fn discard_data_file(&mut self) {
        if let Some(path) = self.data_file.take() {
            discard_scratch_file(&path);
        }
    }

    fn node_at_row(&self, host: &dyn EditorHost, buffer: BufferId, row: usize) -> Option<NodeId> {
        let lines = host.buffer_lines(buffer);
        self.key_node(lines.get(row)?)
    }

    fn key_node(&self, line: &str) -> Option<NodeId> {
        extract_key(line).and_then(|key| self.arena.lookup(key))
    }
}
