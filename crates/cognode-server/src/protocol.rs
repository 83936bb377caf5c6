//! Session protocol messages.
//!
//! Clients send text frames: either a bare question, or a JSON object whose
//! `type` selects a graph edit. The server answers with a stream of JSON
//! events. Inbound parsing is deliberately forgiving; missing fields are
//! carried as `None` and the controller decides whether to act.

use cognode_core::CognitiveNode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parsed client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Attach a user-written node.
    AddNode {
        label: Option<String>,
        parent_id: Option<String>,
    },

    /// Remove a node and everything beneath it.
    DeleteNode { node_id: Option<String> },

    /// Rename a node.
    UpdateNode {
        node_id: Option<String>,
        label: Option<String>,
    },

    /// Ask the model, optionally positioned on a node.
    Question {
        question: String,
        current_node_id: Option<String>,
    },
}

impl InboundMessage {
    /// Parses a text frame. Never fails.
    ///
    /// Text that is not a JSON object is a question with no node context.
    /// Objects without a recognized `type` are questions too; their
    /// `question` defaults to the whole frame.
    pub fn parse(frame: &str) -> Self {
        let object = match serde_json::from_str::<Value>(frame) {
            Ok(Value::Object(object)) => object,
            Ok(Value::String(question)) => return Self::question(question),
            _ => return Self::question(frame),
        };

        match object.get("type").and_then(Value::as_str) {
            Some("add_node") => Self::AddNode {
                label: string_field(&object, "label"),
                parent_id: string_field(&object, "parent_id"),
            },
            Some("delete_node") => Self::DeleteNode {
                node_id: string_field(&object, "node_id"),
            },
            Some("update_node") => Self::UpdateNode {
                node_id: string_field(&object, "node_id"),
                label: string_field(&object, "label"),
            },
            _ => Self::Question {
                question: string_field(&object, "question").unwrap_or_else(|| frame.to_string()),
                current_node_id: string_field(&object, "current_node_id")
                    .filter(|id| !id.is_empty()),
            },
        }
    }

    fn question(text: impl Into<String>) -> Self {
        Self::Question {
            question: text.into(),
            current_node_id: None,
        }
    }

    /// Message type name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::UpdateNode { .. } => "update_node",
            Self::Question { .. } => "question",
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// An event sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// The model's answer to a question.
    Chat { answer: String },

    /// A change to the client's copy of the graph.
    GraphUpdate { payload: GraphUpdate },

    /// A question could not be answered.
    Error { message: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GraphUpdate {
    AddNode { node: CognitiveNode },
    UpdateNode { node: CognitiveNode },
    DeleteNode { node_id: String },
}

impl OutboundEvent {
    pub fn chat(answer: impl Into<String>) -> Self {
        Self::Chat {
            answer: answer.into(),
        }
    }

    pub fn node_added(node: CognitiveNode) -> Self {
        Self::GraphUpdate {
            payload: GraphUpdate::AddNode { node },
        }
    }

    pub fn node_updated(node: CognitiveNode) -> Self {
        Self::GraphUpdate {
            payload: GraphUpdate::UpdateNode { node },
        }
    }

    pub fn node_deleted(node_id: impl Into<String>) -> Self {
        Self::GraphUpdate {
            payload: GraphUpdate::DeleteNode {
                node_id: node_id.into(),
            },
        }
    }

    /// Builds an error event.
    ///
    /// `message` is the innermost cause, which names what actually went
    /// wrong (a status code, a refused connection). `detail` spells out the
    /// full chain from the outermost error down.
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut detail = err.to_string();
        let mut innermost = err;
        while let Some(inner) = innermost.source() {
            detail.push_str(": ");
            detail.push_str(&inner.to_string());
            innermost = inner;
        }
        Self::Error {
            message: innermost.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_text_is_question() {
        assert_eq!(
            InboundMessage::parse("why is the sky blue?"),
            InboundMessage::Question {
                question: "why is the sky blue?".to_string(),
                current_node_id: None,
            }
        );
    }

    #[test]
    fn test_json_string_is_question() {
        assert_eq!(
            InboundMessage::parse("\"hello\""),
            InboundMessage::Question {
                question: "hello".to_string(),
                current_node_id: None,
            }
        );
    }

    #[test]
    fn test_non_object_json_uses_raw_frame() {
        assert_eq!(
            InboundMessage::parse("42"),
            InboundMessage::Question {
                question: "42".to_string(),
                current_node_id: None,
            }
        );
    }

    #[test]
    fn test_question_with_context() {
        let message = InboundMessage::parse(r#"{"question":"Q1","current_node_id":"A"}"#);
        assert_eq!(
            message,
            InboundMessage::Question {
                question: "Q1".to_string(),
                current_node_id: Some("A".to_string()),
            }
        );
        assert_eq!(message.kind(), "question");
    }

    #[test]
    fn test_question_defaults_to_frame_and_drops_empty_context() {
        let frame = r#"{"current_node_id":""}"#;
        assert_eq!(
            InboundMessage::parse(frame),
            InboundMessage::Question {
                question: frame.to_string(),
                current_node_id: None,
            }
        );
    }

    #[test]
    fn test_unknown_type_is_question() {
        let message = InboundMessage::parse(r#"{"type":"rename","question":"q"}"#);
        assert_eq!(message.kind(), "question");
    }

    #[test]
    fn test_typed_messages() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"add_node","label":"x","parent_id":"A"}"#),
            InboundMessage::AddNode {
                label: Some("x".to_string()),
                parent_id: Some("A".to_string()),
            }
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"delete_node","node_id":"n1"}"#),
            InboundMessage::DeleteNode {
                node_id: Some("n1".to_string()),
            }
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"update_node","node_id":7,"label":"y"}"#),
            InboundMessage::UpdateNode {
                node_id: None,
                label: Some("y".to_string()),
            }
        );
    }

    #[test]
    fn test_event_wire_shapes() {
        let node = CognitiveNode::new("child").with_id("n1").with_parent("A", 0);

        assert_eq!(
            serde_json::to_value(OutboundEvent::chat("hi")).unwrap(),
            json!({"type": "chat", "answer": "hi"})
        );
        assert_eq!(
            serde_json::to_value(OutboundEvent::node_added(node.clone())).unwrap(),
            json!({
                "type": "graph_update",
                "payload": {
                    "action": "add_node",
                    "node": {"id": "n1", "label": "child", "parent": "A", "depth": 1}
                }
            })
        );
        assert_eq!(
            serde_json::to_value(OutboundEvent::node_updated(node)).unwrap()["payload"]["action"],
            json!("update_node")
        );
        assert_eq!(
            serde_json::to_value(OutboundEvent::node_deleted("n1")).unwrap(),
            json!({
                "type": "graph_update",
                "payload": {"action": "delete_node", "node_id": "n1"}
            })
        );
    }

    #[test]
    fn test_error_event_carries_cause_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);

        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "outer failed")
            }
        }

        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        assert_eq!(
            serde_json::to_value(OutboundEvent::error(&err)).unwrap(),
            json!({
                "type": "error",
                "message": "disk on fire",
                "detail": "outer failed: disk on fire"
            })
        );
    }

    #[test]
    fn test_error_event_without_source_uses_own_message() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "bad key");
        assert_eq!(
            OutboundEvent::error(&err),
            OutboundEvent::Error {
                message: "bad key".to_string(),
                detail: "bad key".to_string(),
            }
        );
    }
}
