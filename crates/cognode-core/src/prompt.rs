//! System prompt rendering.
//!
//! The prompt asks the model to answer the user and decompose the question
//! into nodes, replying with JSON only. When the client is positioned on a
//! node, the path to it is included so new nodes land beneath it.

use crate::node::CognitiveNode;

/// Where the conversation currently sits in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub node_id: String,
    pub node_label: String,
    /// Labels from the root down to the current node.
    pub path_labels: Vec<String>,
}

impl PromptContext {
    /// Builds a context from a root-first path. `None` for an empty path.
    pub fn from_path(path: &[CognitiveNode]) -> Option<Self> {
        let current = path.last()?;
        Some(Self {
            node_id: current.id.clone(),
            node_label: current.label.clone(),
            path_labels: path.iter().map(|node| node.label.clone()).collect(),
        })
    }

    fn render(&self) -> String {
        format!(
            "Current cognitive context:\n\
             - Current node: {label}\n\
             - Path: {path}\n\
             - Current node ID: {id}\n\
             \n\
             Continue the decomposition beneath the current node; \
             the parent of every new node should be: {id}",
            label = self.node_label,
            path = self.path_labels.join(" > "),
            id = self.node_id,
        )
    }
}

const FIRST_QUESTION: &str =
    "This is the first question; start the decomposition from the root node.";

/// Renders the decomposition system prompt.
pub fn build_system_prompt(context: Option<&PromptContext>) -> String {
    let context = context
        .map(PromptContext::render)
        .unwrap_or_else(|| FIRST_QUESTION.to_string());

    format!(
        r#"You are a cognitive decomposition assistant.

Tasks:
1. Answer the user's question.
2. At the same time, break the question down into "cognitive nodes".

{context}

The output MUST be JSON (no extra text, JSON only):

{{
  "answer": "natural-language answer shown to the user",
  "nodes": [
    {{
      "label": "sub-question / sub-insight",
      "parent": "parent node ID (use the current node ID from the context, if any)"
    }}
  ]
}}

Rules:
- Output JSON only, without any explanatory text.
- The nodes array contains at least 1 node, even for simple questions.
- If a current node context is given, set each new node's parent to the current node ID.
- Keep labels short and precise; each describes one sub-question or insight.
- If this is the first question (no context), parent may be null or "A".
"#
    )
}
