//! Explorer node tree.
//!
//! # Responsibility
//! - Hold tag and note nodes in an arena addressed by `NodeId`.
//! - Implement expand/collapse, rendering, width measurement, rename
//!   detection and change commit per node.
//!
//! # Invariants
//! - Parent links are plain indices and never own their target.
//! - Every node in the arena is registered under exactly one key.
//! - `row` is only meaningful right after a render or a buffer re-scan.
//! - Tag children are loaded at most once per model build.

pub mod change;
pub mod line;
pub mod registry;

use crate::model::note::{Note, Tag};
use crate::store::{NoteFilter, NoteStore, StoreResult};
use change::{Change, ChangeFailure};
use line::{decode_line, encode_line, indentation, LineKind};
use log::{debug, warn};
use registry::{NodeKey, NodeRegistry};
use std::collections::BTreeMap;

/// Index of a node inside its `NodeArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// Glyphs drawn in front of tag names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyphs {
    pub opened: String,
    pub closed: String,
}

/// Layout shared by every line of one render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderAttribs<'a> {
    /// Column after which key brackets start.
    pub key_col: usize,
    pub glyphs: &'a Glyphs,
}

/// Tag-specific node state.
#[derive(Debug, Clone)]
pub struct TagNode {
    pub tag: Tag,
    loaded: bool,
}

impl TagNode {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// Note-specific node state.
#[derive(Debug, Clone)]
pub struct NoteNode {
    pub note: Note,
    title: String,
}

impl NoteNode {
    /// Title as last rendered or adapted from the buffer.
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Tag(TagNode),
    Note(NoteNode),
}

/// One renderable tree element.
#[derive(Debug, Clone)]
pub struct Node {
    key: NodeKey,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    changes: Vec<Change>,
    indent: usize,
    row: Option<usize>,
    expanded: bool,
    pref_width: usize,
    kind: NodeKind,
}

impl Node {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Changes recorded since the last commit, in detection order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn is_visible(&self) -> bool {
        self.row.is_some()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, NodeKind::Note(_))
    }

    /// Id of the store object this node shows.
    pub fn object_id(&self) -> &str {
        match &self.kind {
            NodeKind::Tag(tag) => &tag.tag.id,
            NodeKind::Note(note) => &note.note.id,
        }
    }

    pub fn as_note(&self) -> Option<&NoteNode> {
        match &self.kind {
            NodeKind::Note(note) => Some(note),
            NodeKind::Tag(_) => None,
        }
    }

    fn label(&self, glyphs: &Glyphs) -> String {
        match &self.kind {
            NodeKind::Note(note) => format!("{}{}", indentation(self.indent), note.title),
            NodeKind::Tag(tag) => {
                let count = self.children.len();
                let glyph = if self.expanded || (tag.loaded && count == 0) {
                    &glyphs.opened
                } else {
                    &glyphs.closed
                };
                let mut label = format!("{}{} {}", indentation(self.indent), glyph, tag.tag.name);
                if count != 0 {
                    label.push_str(&format!(" ({count})"));
                }
                label
            }
        }
    }

    fn line_kind(&self) -> LineKind {
        match self.kind {
            NodeKind::Tag(_) => LineKind::Tag,
            NodeKind::Note(_) => LineKind::Note,
        }
    }
}

/// Arena of explorer nodes plus the registry of their keys.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    registry: NodeRegistry,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node and registry entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.registry.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Resolves a key read back from the buffer.
    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.registry.get(key)
    }

    /// Node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn add_tag(&mut self, tag: Tag, indent: usize) -> NodeId {
        self.insert(
            NodeKind::Tag(TagNode { tag, loaded: false }),
            indent,
            None,
        )
    }

    pub fn add_note(&mut self, note: Note, indent: usize, parent: Option<NodeId>) -> NodeId {
        let title = note.display_title();
        self.insert(NodeKind::Note(NoteNode { note, title }), indent, parent)
    }

    fn insert(&mut self, kind: NodeKind, indent: usize, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let object_id = match &kind {
            NodeKind::Tag(tag) => tag.tag.id.clone(),
            NodeKind::Note(note) => note.note.id.clone(),
        };
        let key = self.registry.register(&object_id, id);
        self.nodes.push(Node {
            key,
            parent,
            children: Vec::new(),
            changes: Vec::new(),
            indent,
            row: None,
            expanded: false,
            pref_width: 0,
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Expands a node, loading tag children from the store on first use.
    ///
    /// On store failure the node stays collapsed and unloaded.
    pub fn expand(&mut self, id: NodeId, store: &dyn NoteStore) -> StoreResult<()> {
        let pending_load = match &self.nodes[id.0].kind {
            NodeKind::Tag(tag) if !tag.loaded => Some(tag.tag.name.clone()),
            _ => None,
        };

        if let Some(name) = pending_load {
            let mut notes = store.list_notes(&NoteFilter::labeled(name.as_str()))?;
            notes.sort_by(|a, b| a.title.cmp(&b.title));
            let child_indent = self.nodes[id.0].indent + 1;
            debug!(
                "event=tag_load module=tree status=ok child_count={}",
                notes.len()
            );
            for note in notes {
                self.add_note(note, child_indent, Some(id));
            }
            if let NodeKind::Tag(tag) = &mut self.nodes[id.0].kind {
                tag.loaded = true;
            }
        }

        self.nodes[id.0].expanded = true;
        Ok(())
    }

    pub fn close(&mut self, id: NodeId) {
        self.nodes[id.0].expanded = false;
    }

    /// Flips the expanded flag and returns the new state.
    pub fn toggle(&mut self, id: NodeId, store: &dyn NoteStore) -> StoreResult<bool> {
        if self.nodes[id.0].expanded {
            self.close(id);
            Ok(false)
        } else {
            self.expand(id, store)?;
            Ok(true)
        }
    }

    /// Recomputes every node's preferred width from its label.
    pub fn measure_all(&mut self, glyphs: &Glyphs) {
        for node in &mut self.nodes {
            node.pref_width = node.label(glyphs).chars().count();
        }
    }

    /// Own width when every ancestor is expanded, otherwise 0.
    pub fn preferred_width(&self, id: NodeId) -> usize {
        let node = &self.nodes[id.0];
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let parent = &self.nodes[parent.0];
            if !parent.expanded {
                return 0;
            }
            cursor = parent.parent;
        }
        node.pref_width
    }

    /// Widest preferred width over all nodes.
    pub fn max_preferred_width(&self) -> usize {
        self.ids()
            .map(|id| self.preferred_width(id))
            .max()
            .unwrap_or(0)
    }

    /// Appends the node's line (and its expanded subtree) to `out`.
    pub fn render(&mut self, id: NodeId, out: &mut Vec<String>, attribs: &RenderAttribs<'_>) {
        let node = &mut self.nodes[id.0];
        let label = node.label(attribs.glyphs);
        node.pref_width = label.chars().count();
        out.push(encode_line(
            &label,
            attribs.key_col,
            node.line_kind(),
            node.key.as_str(),
        ));
        node.row = Some(out.len() - 1);

        if node.expanded {
            let children = node.children.clone();
            for child in children {
                self.render(child, out, attribs);
            }
        }
    }

    /// Marks every node as not rendered.
    pub fn reset_rows(&mut self) {
        for node in &mut self.nodes {
            node.row = None;
        }
    }

    pub fn set_row(&mut self, id: NodeId, row: usize) {
        self.nodes[id.0].row = Some(row);
    }

    /// Interprets an edited buffer line as a change to this node.
    ///
    /// Only note titles are recognized. Lines that do not decode as a note
    /// line leave the node untouched.
    pub fn adapt(&mut self, id: NodeId, line: &str) -> bool {
        let Some(decoded) = decode_line(line) else {
            return false;
        };
        if decoded.kind != LineKind::Note {
            return false;
        }
        let title = decoded.text().to_string();

        let node = &mut self.nodes[id.0];
        let NodeKind::Note(note) = &mut node.kind else {
            return false;
        };
        if note.title == title {
            return false;
        }

        node.changes.push(Change::Rename {
            note_id: note.note.id.clone(),
            new_title: title.clone(),
        });
        note.title = title;
        true
    }

    /// Applies pending changes in order, then clears them whatever the outcome.
    pub fn commit_changes(&mut self, id: NodeId, store: &dyn NoteStore) -> Vec<ChangeFailure> {
        let node = &mut self.nodes[id.0];
        let changes = std::mem::take(&mut node.changes);
        let mut failures = Vec::new();
        for change in changes {
            let result = match &mut node.kind {
                NodeKind::Note(note) => change.apply(&mut note.note, store),
                NodeKind::Tag(_) => {
                    warn!(
                        "event=change_apply module=tree status=skipped reason=tag_target key={}",
                        node.key
                    );
                    continue;
                }
            };
            if let Err(error) = result {
                failures.push(ChangeFailure::new(node.key.clone(), change, error));
            }
        }
        failures
    }

    /// Reloads a note node from the store and resets its title.
    pub fn refresh(&mut self, id: NodeId, store: &dyn NoteStore) -> StoreResult<()> {
        let NodeKind::Note(note) = &mut self.nodes[id.0].kind else {
            return Ok(());
        };
        let fresh = store.get_note(&note.note.id)?;
        note.title = fresh.display_title();
        note.note = fresh;
        Ok(())
    }

    /// Copies title fields from another instance of the same note.
    pub(crate) fn mirror_note(&mut self, id: NodeId, source: &Note) {
        if let NodeKind::Note(note) = &mut self.nodes[id.0].kind {
            note.note = source.clone();
            note.title = source.display_title();
        }
    }

    /// Expanded flag of every node, keyed by render key.
    pub fn expand_state(&self) -> BTreeMap<NodeKey, bool> {
        self.nodes
            .iter()
            .map(|node| (node.key.clone(), node.expanded))
            .collect()
    }

    /// Re-applies a snapshot taken by `expand_state`; unknown keys are ignored.
    pub fn restore_expand_state(
        &mut self,
        state: &BTreeMap<NodeKey, bool>,
        store: &dyn NoteStore,
    ) {
        for (key, expanded) in state {
            let Some(id) = self.lookup(key.as_str()) else {
                continue;
            };
            if *expanded {
                if let Err(err) = self.expand(id, store) {
                    warn!(
                        "event=expand_restore module=tree status=error key={} error={}",
                        key, err
                    );
                }
            } else {
                self.close(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Glyphs, NodeArena, NodeKind, RenderAttribs};
    use crate::model::note::{Note, Tag};
    use crate::store::{MemoryNoteStore, NoteFlags, NoteStore};
    use crate::tree::change::Change;

    fn glyphs() -> Glyphs {
        Glyphs {
            opened: "-".to_string(),
            closed: "+".to_string(),
        }
    }

    fn store_with_tagged_notes() -> MemoryNoteStore {
        let store = MemoryNoteStore::new();
        store.insert_label("t1", "Work");
        store.insert_note(Note::new("n2", "Zeta", ""), NoteFlags::default());
        store.insert_note(
            Note::new("n1", "A rather long note title", ""),
            NoteFlags::default(),
        );
        let labels = vec!["Work".to_string()];
        store.set_note_labels("n1", &labels).expect("label n1");
        store.set_note_labels("n2", &labels).expect("label n2");
        store
    }

    #[test]
    fn expand_loads_children_once_sorted_by_title() {
        let store = store_with_tagged_notes();
        let mut arena = NodeArena::new();
        let tag = arena.add_tag(Tag::new("t1", "Work"), 0);

        arena.expand(tag, &store).expect("expand");
        arena.close(tag);
        arena.expand(tag, &store).expect("expand again");

        let node = arena.get(tag).expect("tag node");
        assert!(node.is_expanded());
        assert_eq!(node.children().len(), 2);
        let first = arena.get(node.children()[0]).expect("first child");
        assert_eq!(first.object_id(), "n1");
        assert_eq!(first.indent(), 1);
        assert_eq!(first.parent(), Some(tag));
    }

    #[test]
    fn toggle_flips_state() {
        let store = MemoryNoteStore::new();
        let mut arena = NodeArena::new();
        let tag = arena.add_tag(Tag::new("t1", "Empty"), 0);
        assert!(arena.toggle(tag, &store).expect("toggle open"));
        assert!(!arena.toggle(tag, &store).expect("toggle closed"));
    }

    #[test]
    fn collapsed_children_do_not_count_towards_width() {
        let store = store_with_tagged_notes();
        let mut arena = NodeArena::new();
        let tag = arena.add_tag(Tag::new("t1", "Work"), 0);
        arena.expand(tag, &store).expect("expand");
        arena.close(tag);
        arena.measure_all(&glyphs());

        let tag_width = arena.preferred_width(tag);
        assert_eq!(arena.max_preferred_width(), tag_width);

        arena.expand(tag, &store).expect("expand");
        arena.measure_all(&glyphs());
        assert_eq!(
            arena.max_preferred_width(),
            "    A rather long note title".chars().count()
        );
    }

    #[test]
    fn tag_label_shows_glyph_and_child_count() {
        let store = store_with_tagged_notes();
        let mut arena = NodeArena::new();
        let tag = arena.add_tag(Tag::new("t1", "Work"), 0);
        let empty = arena.add_tag(Tag::new("t2", "Empty"), 0);
        arena.expand(empty, &store).expect("expand empty");
        arena.close(empty);

        let glyphs = glyphs();
        let attribs = RenderAttribs {
            key_col: 12,
            glyphs: &glyphs,
        };
        let mut out = Vec::new();
        arena.render(tag, &mut out, &attribs);
        arena.render(empty, &mut out, &attribs);
        assert_eq!(out[0], "+ Work       T[t1(0)]");
        assert_eq!(out[1], "- Empty      T[t2(0)]");

        arena.expand(tag, &store).expect("expand");
        let mut out = Vec::new();
        arena.render(tag, &mut out, &attribs);
        assert_eq!(out.len(), 3);
        assert!(out[0].starts_with("- Work (2)"));
        assert_eq!(arena.get(tag).and_then(|node| node.row()), Some(0));
    }

    #[test]
    fn adapt_records_rename_once() {
        let mut arena = NodeArena::new();
        let note = arena.add_note(Note::new("id", "Old Title", ""), 1, None);

        assert!(!arena.adapt(note, "    Old Title n[id(0)]"));
        assert!(arena.adapt(note, "    New Title n[id(0)]"));
        assert!(!arena.adapt(note, "    New Title n[id(0)]"));

        let node = arena.get(note).expect("note node");
        assert_eq!(
            node.changes(),
            &[Change::Rename {
                note_id: "id".to_string(),
                new_title: "New Title".to_string(),
            }]
        );
        assert_eq!(node.as_note().map(|n| n.title()), Some("New Title"));
    }

    #[test]
    fn adapt_ignores_damaged_lines_and_tags() {
        let mut arena = NodeArena::new();
        let note = arena.add_note(Note::new("id", "Title", ""), 0, None);
        let tag = arena.add_tag(Tag::new("t", "Tag"), 0);

        assert!(!arena.adapt(note, "Something else n[id(0)"));
        assert!(!arena.adapt(note, "Other T[id(0)]"));
        assert!(!arena.adapt(tag, "Renamed T[t(0)]"));
        assert!(arena.get(note).expect("note").changes().is_empty());
    }

    #[test]
    fn commit_applies_and_clears_even_on_failure() {
        let store = MemoryNoteStore::new();
        store.insert_note(Note::new("id", "Old", ""), NoteFlags::default());
        let mut arena = NodeArena::new();
        let kept = arena.add_note(Note::new("id", "Old", ""), 0, None);
        let orphan = arena.add_note(Note::new("gone", "Old", ""), 0, None);

        assert!(arena.adapt(kept, "New n[id(0)]"));
        assert!(arena.adapt(orphan, "New n[gone(0)]"));

        assert!(arena.commit_changes(kept, &store).is_empty());
        let failures = arena.commit_changes(orphan, &store);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key.as_str(), "gone(0)");

        assert!(arena.get(kept).expect("kept").changes().is_empty());
        assert!(arena.get(orphan).expect("orphan").changes().is_empty());
        assert_eq!(store.get_note("id").expect("reload").title, "New");
    }

    #[test]
    fn expand_state_survives_rebuild() {
        let store = store_with_tagged_notes();
        let mut arena = NodeArena::new();
        let tag = arena.add_tag(Tag::new("t1", "Work"), 0);
        arena.expand(tag, &store).expect("expand");
        let snapshot = arena.expand_state();

        arena.clear();
        let rebuilt = arena.add_tag(Tag::new("t1", "Work"), 0);
        arena.restore_expand_state(&snapshot, &store);

        let node = arena.get(rebuilt).expect("rebuilt tag");
        assert!(node.is_expanded());
        assert!(matches!(node.kind(), NodeKind::Tag(tag) if tag.is_loaded()));
    }
}
