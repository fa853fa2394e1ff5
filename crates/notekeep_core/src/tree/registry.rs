//! Key → node index for one model build.
//!
//! # Responsibility
//! - Assign render keys of the form `objectId(instance)`.
//! - Resolve keys read back from the buffer to live arena nodes.
//! - Index node instances by the object they show.
//!
//! # Invariants
//! - Instance numbers per object id start at 0 and strictly increase until
//!   `clear()`.
//! - Keys are unique within the registry.
//! - Entries are only dropped by `clear()`.

use super::NodeId;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Render key of one node instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(object_id: &str, instance: u32) -> Self {
        Self(format!("{object_id}({instance})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Registry of node instances for the current model build.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    by_key: HashMap<NodeKey, NodeId>,
    by_object: HashMap<String, Vec<NodeId>>,
    last_instance: HashMap<String, u32>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node showing `object_id` and returns its fresh key.
    pub fn register(&mut self, object_id: &str, node: NodeId) -> NodeKey {
        let instance = match self.last_instance.get(object_id) {
            Some(last) => last + 1,
            None => 0,
        };
        self.last_instance.insert(object_id.to_string(), instance);

        let key = NodeKey::new(object_id, instance);
        self.by_key.insert(key.clone(), node);
        self.by_object
            .entry(object_id.to_string())
            .or_default()
            .push(node);
        key
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.by_key.get(&NodeKey::from(key)).copied()
    }

    pub fn get_by_instance(&self, object_id: &str, instance: u32) -> Option<NodeId> {
        self.by_key.get(&NodeKey::new(object_id, instance)).copied()
    }

    /// Every registered node showing `object_id`, in registration order.
    pub fn instances_of(&self, object_id: &str) -> &[NodeId] {
        self.by_object
            .get(object_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Drops every entry and restarts instance numbering.
    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_object.clear();
        self.last_instance.clear();
    }
}
