use cognode_core::CognitiveNode;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
}

/// Nodes of one session's decomposition tree, keyed by id.
///
/// Sibling listings follow insertion order, so cascading deletes report
/// the same sequence every run.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<String, CognitiveNode>,
    /// Insertion sequence per id.
    order: HashMap<String, u64>,
    next_order: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns a snapshot of it.
    ///
    /// A parent that is not in the store is dropped and the node becomes a
    /// root. Never fails. `explicit_id` replaces the generated id and
    /// overwrites any node already stored under it.
    pub fn add_node(
        &mut self,
        label: impl Into<String>,
        parent_id: Option<&str>,
        explicit_id: Option<&str>,
    ) -> CognitiveNode {
        let mut node = CognitiveNode::new(label);

        match parent_id.and_then(|id| self.nodes.get(id)) {
            Some(parent) => node = node.with_parent(parent.id.clone(), parent.depth),
            None => {
                if let Some(missing) = parent_id {
                    debug!(parent = missing, "Parent not in graph, adding as root");
                }
            }
        }

        if let Some(id) = explicit_id {
            node = node.with_id(id);
        }

        self.insert(node.clone());
        node
    }

    /// Stores a node. Replacing an existing id keeps its original position.
    fn insert(&mut self, node: CognitiveNode) {
        self.order.entry(node.id.clone()).or_insert(self.next_order);
        self.next_order += 1;
        self.nodes.insert(node.id.clone(), node);
    }

    fn in_insertion_order<'a>(
        &self,
        nodes: impl Iterator<Item = &'a CognitiveNode>,
    ) -> Vec<&'a CognitiveNode> {
        let mut nodes: Vec<&CognitiveNode> = nodes.collect();
        nodes.sort_by_key(|node| self.order.get(&node.id).copied().unwrap_or(u64::MAX));
        nodes
    }

    pub fn get_node(&self, id: &str) -> Option<&CognitiveNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the nodes from the root down to `id`.
    ///
    /// Stops at the first parent link that no longer resolves, so a node
    /// whose ancestor was deleted yields a partial path. Unknown ids yield
    /// an empty path.
    pub fn get_path_to_node(&self, id: &str) -> Vec<CognitiveNode> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(current_id) = current {
            if !seen.insert(current_id) {
                break;
            }
            let Some(node) = self.nodes.get(current_id) else {
                break;
            };
            path.push(node.clone());
            current = node.parent.as_deref();
        }

        path.reverse();
        path
    }

    /// Replaces a node's label and returns the updated node.
    pub fn update_label(
        &mut self,
        id: &str,
        label: impl Into<String>,
    ) -> Result<&CognitiveNode, GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.label = label.into();
        Ok(node)
    }

    /// Removes `id` and all of its descendants.
    ///
    /// Returns the removed ids in preorder: `id` first, every node after its
    /// parent, siblings in insertion order. Unknown ids remove nothing. Children are
    /// found by scanning for matching parent links; the visited set keeps a
    /// corrupted cycle from looping.
    pub fn delete_subtree(&mut self, id: &str) -> Vec<String> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }

        let mut collected = Vec::new();
        let mut scheduled: HashSet<String> = HashSet::new();
        let mut frontier = vec![id.to_string()];
        scheduled.insert(id.to_string());

        while let Some(current) = frontier.pop() {
            let children: Vec<String> = self
                .children(&current)
                .into_iter()
                .map(|child| child.id.clone())
                .filter(|child| !scheduled.contains(child))
                .collect();

            // Reverse so the stack pops the oldest child first.
            for child in children.into_iter().rev() {
                scheduled.insert(child.clone());
                frontier.push(child);
            }
            collected.push(current);
        }

        for removed in &collected {
            self.nodes.remove(removed);
            self.order.remove(removed);
        }

        debug!(root = id, removed = collected.len(), "Deleted subtree");
        collected
    }

    /// Direct children of `id`, oldest first.
    pub fn children(&self, id: &str) -> Vec<&CognitiveNode> {
        self.in_insertion_order(
            self.nodes
                .values()
                .filter(|node| node.parent.as_deref() == Some(id)),
        )
    }

    /// Nodes without a parent, oldest first.
    pub fn roots(&self) -> Vec<&CognitiveNode> {
        self.in_insertion_order(self.nodes.values().filter(|node| node.is_root()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CognitiveNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts a node as-is, bypassing parent normalization.
    #[cfg(test)]
    fn insert_raw(&mut self, node: CognitiveNode) {
        self.insert(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognode_core::ROOT_ID;

    /// A -> (b -> (c, d), e)
    fn sample() -> (GraphStore, [String; 4]) {
        let mut store = GraphStore::new();
        store.add_node("root", None, Some(ROOT_ID));
        let b = store.add_node("b", Some(ROOT_ID), None).id;
        let c = store.add_node("c", Some(&b), None).id;
        let d = store.add_node("d", Some(&b), None).id;
        let e = store.add_node("e", Some(ROOT_ID), None).id;
        (store, [b, c, d, e])
    }

    #[test]
    fn test_depth_follows_parent() {
        let (store, [b, c, _, _]) = sample();

        assert_eq!(store.get_node(ROOT_ID).unwrap().depth, 0);
        assert_eq!(store.get_node(&b).unwrap().depth, 1);
        let c = store.get_node(&c).unwrap();
        assert_eq!(c.depth, 2);
        assert_eq!(c.parent.as_deref(), Some(b.as_str()));
    }

    #[test]
    fn test_missing_parent_demotes_to_root() {
        let mut store = GraphStore::new();
        let node = store.add_node("orphan", Some("does-not-exist"), None);

        assert_eq!(node.parent, None);
        assert_eq!(node.depth, 0);
        assert_eq!(store.roots().len(), 1);
    }

    #[test]
    fn test_explicit_id_overrides_generated() {
        let mut store = GraphStore::new();
        let node = store.add_node("root", None, Some(ROOT_ID));

        assert_eq!(node.id, ROOT_ID);
        assert!(store.contains(ROOT_ID));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_path_to_root_is_single_node() {
        let (store, _) = sample();
        let path = store.get_path_to_node(ROOT_ID);

        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id, ROOT_ID);
    }

    #[test]
    fn test_path_is_root_first() {
        let (store, [b, c, _, _]) = sample();
        let ids: Vec<String> = store
            .get_path_to_node(&c)
            .into_iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(ids, vec![ROOT_ID.to_string(), b, c]);
    }

    #[test]
    fn test_path_stops_at_dangling_parent() {
        let mut store = GraphStore::new();
        store.insert_raw(CognitiveNode::new("lost").with_id("x").with_parent("gone", 3));

        let path = store.get_path_to_node("x");
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id, "x");
        assert!(store.get_path_to_node("nope").is_empty());
    }

    #[test]
    fn test_update_label() {
        let (mut store, [b, _, _, _]) = sample();
        let updated = store.update_label(&b, "renamed").unwrap();

        assert_eq!(updated.label, "renamed");
        assert_eq!(updated.depth, 1);
        assert_eq!(store.get_node(&b).unwrap().label, "renamed");
    }

    #[test]
    fn test_update_missing_node_reports_not_found() {
        let (mut store, _) = sample();
        let before = store.len();

        assert_eq!(
            store.update_label("missing", "x").unwrap_err(),
            GraphError::NodeNotFound("missing".to_string())
        );
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_delete_subtree_removes_descendants() {
        let (mut store, [b, c, d, e]) = sample();
        let removed = store.delete_subtree(&b);

        assert_eq!(removed.len(), 3);
        assert_eq!(removed[0], b);
        assert!(removed.contains(&c));
        assert!(removed.contains(&d));

        for id in [&b, &c, &d] {
            assert!(!store.contains(id));
        }
        assert!(store.contains(&e));
        assert!(store.contains(ROOT_ID));
        assert!(store
            .nodes()
            .all(|n| n.parent.as_deref().map_or(true, |p| store.contains(p))));
    }

    #[test]
    fn test_delete_order_puts_parents_first() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", None, None).id;
        let b = store.add_node("b", Some(&a), None).id;
        let c = store.add_node("c", Some(&b), None).id;
        let d = store.add_node("d", Some(&c), None).id;

        assert_eq!(store.delete_subtree(&a), vec![a, b, c, d]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_lists_siblings_in_insertion_order() {
        let mut store = GraphStore::new();
        store.add_node("root", None, Some(ROOT_ID));
        let parent = store.add_node("parent", Some(ROOT_ID), None).id;

        let mut expected = vec![parent.clone()];
        for i in 0..20 {
            let child = store.add_node(format!("child {}", i), Some(&parent), None).id;
            expected.push(child.clone());
            if i == 3 {
                let grandchild = store.add_node("grandchild", Some(&child), None).id;
                expected.push(grandchild);
            }
        }

        assert_eq!(store.delete_subtree(&parent), expected);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_children_are_oldest_first() {
        let (mut store, [b, _, _, e]) = sample();
        store.update_label(&b, "renamed").unwrap();
        store.add_node("root", None, Some(ROOT_ID));

        let ids: Vec<&str> = store
            .children(ROOT_ID)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec![b.as_str(), e.as_str()]);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let (mut store, _) = sample();
        assert!(store.delete_subtree("missing").is_empty());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_delete_survives_cycle() {
        let mut store = GraphStore::new();
        store.insert_raw(CognitiveNode::new("x").with_id("x").with_parent("y", 0));
        store.insert_raw(CognitiveNode::new("y").with_id("y").with_parent("x", 0));
        store.insert_raw(CognitiveNode::new("z").with_id("z").with_parent("y", 0));

        let removed = store.delete_subtree("x");
        assert_eq!(removed.len(), 3);
        assert!(store.is_empty());
    }

    #[test]
    fn test_path_survives_cycle() {
        let mut store = GraphStore::new();
        store.insert_raw(CognitiveNode::new("x").with_id("x").with_parent("y", 0));
        store.insert_raw(CognitiveNode::new("y").with_id("y").with_parent("x", 0));

        assert_eq!(store.get_path_to_node("x").len(), 2);
    }
}
