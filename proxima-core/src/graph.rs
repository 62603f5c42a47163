//! Graph storage: centrally owned node arena, per-node friend locks, and the
//! object-id table that publishes nodes.
//!
//! The friend graph is cyclic, so nodes live in one arena indexed by internal
//! id and friend lists store ids rather than references. Each friend list is
//! guarded by its own mutex, held only long enough to snapshot or append; the
//! table mutex covers map mutation and the initial-empty check and nothing
//! else.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, OnceLock,
    },
};

use crate::types::{NodeId, ObjectId};

/// One slot in the node arena. Only the friend list is mutable, and only
/// under the node's own lock.
#[derive(Debug, Default)]
pub(crate) struct GraphNode {
    friends: Mutex<Vec<NodeId>>,
}

/// Arena, node table, and entry point for one index instance.
#[derive(Debug)]
pub(crate) struct Graph {
    nodes: Vec<GraphNode>,
    table: Mutex<BTreeMap<ObjectId, NodeId>>,
    entry: OnceLock<NodeId>,
    published: AtomicUsize,
}

impl Graph {
    /// Creates an arena with one (unpublished) slot per dataset object.
    pub(crate) fn with_len(len: usize) -> Self {
        let mut nodes = Vec::with_capacity(len);
        nodes.resize_with(len, GraphNode::default);
        Self {
            nodes,
            table: Mutex::new(BTreeMap::new()),
            entry: OnceLock::new(),
            published: AtomicUsize::new(0),
        }
    }

    /// Number of arena slots (the dataset size).
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes published through the table so far.
    pub(crate) fn published(&self) -> usize {
        self.published.load(Ordering::Acquire)
    }

    /// The fixed traversal entry point, if any node has been seeded.
    pub(crate) fn entry(&self) -> Option<NodeId> {
        self.entry.get().copied()
    }

    /// Captures the entry point; later calls are ignored.
    pub(crate) fn set_entry(&self, node: NodeId) {
        let _ = self.entry.set(node);
    }

    /// Checks the initial-empty condition under the table lock.
    pub(crate) fn is_table_empty(&self) -> bool {
        self.table.lock().expect("node table lock poisoned").is_empty()
    }

    /// Publishes a node, making it discoverable through the table.
    pub(crate) fn publish(&self, obj_id: ObjectId, node: NodeId) {
        let mut table = self.table.lock().expect("node table lock poisoned");
        table.insert(obj_id, node);
        self.published.store(table.len(), Ordering::Release);
    }

    /// Snapshots the table in ascending `obj_id` order.
    pub(crate) fn table_snapshot(&self) -> Vec<(ObjectId, NodeId)> {
        self.table
            .lock()
            .expect("node table lock poisoned")
            .iter()
            .map(|(&obj_id, &node)| (obj_id, node))
            .collect()
    }

    /// Empties a node's friend list before it enters the graph.
    pub(crate) fn clear_friends(&self, node: NodeId) {
        self.nodes[node]
            .friends
            .lock()
            .expect("node lock poisoned")
            .clear();
    }

    /// Links two distinct nodes bidirectionally without a duplicate check.
    ///
    /// Both node locks are taken in ascending internal-id order; no other
    /// path ever holds two node locks at once.
    pub(crate) fn link(&self, a: NodeId, b: NodeId) {
        debug_assert_ne!(a, b, "a node cannot be linked to itself");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let mut first_friends = self.nodes[first]
            .friends
            .lock()
            .expect("node lock poisoned");
        let mut second_friends = self.nodes[second]
            .friends
            .lock()
            .expect("node lock poisoned");
        if first == a {
            first_friends.push(b);
            second_friends.push(a);
        } else {
            first_friends.push(a);
            second_friends.push(b);
        }
    }

    /// Appends a one-directional edge without a duplicate check.
    ///
    /// Only the loader uses this; saved records already contain both
    /// directions of every edge.
    pub(crate) fn push_friend(&self, node: NodeId, friend: NodeId) {
        self.nodes[node]
            .friends
            .lock()
            .expect("node lock poisoned")
            .push(friend);
    }

    /// Snapshots a node's friends into `buf` under the node's lock.
    pub(crate) fn copy_friends_into(&self, node: NodeId, buf: &mut Vec<NodeId>) {
        let friends = self.nodes[node].friends.lock().expect("node lock poisoned");
        buf.clear();
        buf.extend_from_slice(&friends);
    }

    /// Clones a node's friend list. Convenience for serialization and
    /// invariant checks, not for hot paths.
    pub(crate) fn friends_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node]
            .friends
            .lock()
            .expect("node lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_writes_both_endpoints() {
        let graph = Graph::with_len(3);
        graph.link(0, 2);
        graph.link(2, 1);
        assert_eq!(graph.friends_of(0), vec![2]);
        assert_eq!(graph.friends_of(2), vec![0, 1]);
        assert_eq!(graph.friends_of(1), vec![2]);
    }

    #[test]
    fn link_does_not_deduplicate() {
        let graph = Graph::with_len(2);
        graph.link(0, 1);
        graph.link(0, 1);
        assert_eq!(graph.friends_of(0), vec![1, 1]);
        assert_eq!(graph.friends_of(1), vec![0, 0]);
    }

    #[test]
    fn publish_grows_the_table_in_obj_id_order() {
        let graph = Graph::with_len(3);
        assert!(graph.is_table_empty());
        graph.publish(30, 0);
        graph.publish(10, 1);
        graph.publish(20, 2);
        assert_eq!(graph.published(), 3);
        assert_eq!(graph.table_snapshot(), vec![(10, 1), (20, 2), (30, 0)]);
    }

    #[test]
    fn entry_point_is_set_once() {
        let graph = Graph::with_len(2);
        assert_eq!(graph.entry(), None);
        graph.set_entry(0);
        graph.set_entry(1);
        assert_eq!(graph.entry(), Some(0));
    }

    #[test]
    fn clear_friends_resets_a_slot() {
        let graph = Graph::with_len(2);
        graph.link(0, 1);
        graph.clear_friends(0);
        assert!(graph.friends_of(0).is_empty());
        assert_eq!(graph.friends_of(1), vec![0]);
    }
}
