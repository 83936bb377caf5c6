//! Cognitive node representation.
//!
//! A CognitiveNode is one step in a question decomposition: a sub-question
//! or sub-insight hanging off the node it was derived from. Nodes only
//! carry a label; everything else is structure.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Id of the designated root node. Clients address it before it exists.
pub const ROOT_ID: &str = "A";

/// Label given to the root when it is bootstrapped on first use.
pub const ROOT_LABEL: &str = "Root question";

/// One node of the decomposition tree.
///
/// Serializes as `{"id", "label", "parent", "depth"}` with `parent` set to
/// `null` for roots, which is exactly what clients receive in graph updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveNode {
    /// Opaque identifier, immutable after creation.
    pub id: String,

    /// Display text. The only mutable part of a node.
    pub label: String,

    /// Id of the node this one was derived from, `None` for roots.
    pub parent: Option<String>,

    /// Distance from the root, fixed when the node is created.
    pub depth: u32,
}

impl CognitiveNode {
    /// Generates a fresh random id.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Creates a root node with a generated id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Self::generate_id(),
            label: label.into(),
            parent: None,
            depth: 0,
        }
    }

    /// Builder pattern: replace the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder pattern: attach below a parent at the given parent depth.
    pub fn with_parent(mut self, parent: impl Into<String>, parent_depth: u32) -> Self {
        self.parent = Some(parent.into());
        self.depth = parent_depth + 1;
        self
    }

    /// Whether this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl PartialEq for CognitiveNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CognitiveNode {}

impl Hash for CognitiveNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CognitiveNode::new("a");
        let b = CognitiveNode::new("a");
        assert_ne!(a.id, b.id);
        assert!(a.is_root());
    }

    #[test]
    fn test_with_parent_sets_depth() {
        let node = CognitiveNode::new("child").with_parent("p", 2);
        assert_eq!(node.parent.as_deref(), Some("p"));
        assert_eq!(node.depth, 3);
    }

    #[test]
    fn test_wire_shape() {
        let node = CognitiveNode::new("root").with_id(ROOT_ID);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({"id": "A", "label": "root", "parent": null, "depth": 0})
        );
    }
}
