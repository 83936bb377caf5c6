//! Structured reply recovery from raw model text.
//!
//! Models are asked for bare JSON but regularly wrap it in chatter, code
//! fences or nothing at all. Extraction tries progressively weaker
//! strategies and never fails: the worst case is a reply whose answer is
//! the raw text and which proposes no nodes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Maximum characters of the answer kept in a synthesized node label.
pub const SUMMARY_CHARS: usize = 50;

/// Appended to synthesized labels.
pub const ELLIPSIS: &str = "...";

/// First brace-delimited object with at most one level of nesting.
static EMBEDDED_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("embedded object pattern is valid")
});

/// A node the model proposes to add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedNode {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ProposedNode {
    /// Reads a node entry, dropping it when it has no usable label.
    fn from_value(value: &Value) -> Option<Self> {
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())?;
        let parent = value
            .get("parent")
            .and_then(Value::as_str)
            .filter(|parent| !parent.is_empty())
            .map(str::to_string);

        Some(Self {
            label: label.to_string(),
            parent,
        })
    }
}

/// The structured part of a model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    /// Natural-language answer shown to the user.
    #[serde(default)]
    pub answer: String,

    /// Sub-questions to attach to the graph, in the order given.
    #[serde(default)]
    pub nodes: Vec<ProposedNode>,
}

impl ModelReply {
    /// Reads a reply from a JSON value.
    ///
    /// Anything other than an object is rejected. Inside the object, a
    /// missing or mistyped `answer` becomes empty and a missing or mistyped
    /// `nodes` becomes an empty list.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let answer = object
            .get("answer")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let nodes = object
            .get("nodes")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(ProposedNode::from_value).collect())
            .unwrap_or_default();

        Some(Self { answer, nodes })
    }

    /// Applies the context node to the reply.
    ///
    /// With a context, a reply that answers without proposing anything gets
    /// one node summarizing the answer, and every node without a parent is
    /// attached to the context.
    pub fn finalize(mut self, context_id: Option<&str>) -> Self {
        let Some(context) = context_id.filter(|id| !id.is_empty()) else {
            return self;
        };

        if self.nodes.is_empty() && !self.answer.is_empty() {
            self.nodes.push(ProposedNode {
                label: summary_label(&self.answer),
                parent: Some(context.to_string()),
            });
        }

        for node in &mut self.nodes {
            if node.parent.is_none() {
                node.parent = Some(context.to_string());
            }
        }

        self
    }
}

/// How a reply was recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The whole text was a JSON object.
    Parsed(ModelReply),
    /// A JSON object was found inside surrounding text.
    Embedded(ModelReply),
    /// Nothing parsed; the raw text became the answer.
    Fallback(ModelReply),
}

impl Extraction {
    /// Short name of the strategy that succeeded, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Extraction::Parsed(_) => "parsed",
            Extraction::Embedded(_) => "embedded",
            Extraction::Fallback(_) => "fallback",
        }
    }

    pub fn reply(&self) -> &ModelReply {
        match self {
            Extraction::Parsed(reply)
            | Extraction::Embedded(reply)
            | Extraction::Fallback(reply) => reply,
        }
    }

    pub fn into_reply(self) -> ModelReply {
        match self {
            Extraction::Parsed(reply)
            | Extraction::Embedded(reply)
            | Extraction::Fallback(reply) => reply,
        }
    }
}

/// Recovers a structured reply from raw model text.
///
/// Tries, in order: the whole trimmed text as JSON, then the first
/// brace-delimited object found in the text, then gives up and uses the
/// raw text as the answer. Only the first embedded candidate is tried.
pub fn extract_reply(text: &str) -> Extraction {
    if let Some(reply) = parse_object(text.trim()) {
        return Extraction::Parsed(reply);
    }

    if let Some(candidate) = EMBEDDED_OBJECT.find(text) {
        if let Some(reply) = parse_object(candidate.as_str()) {
            return Extraction::Embedded(reply);
        }
        debug!(
            start = candidate.start(),
            end = candidate.end(),
            "Embedded object did not parse"
        );
    }

    Extraction::Fallback(ModelReply {
        answer: text.to_string(),
        nodes: Vec::new(),
    })
}

fn parse_object(text: &str) -> Option<ModelReply> {
    let value: Value = serde_json::from_str(text).ok()?;
    ModelReply::from_value(&value)
}

/// Truncates an answer into a node label.
fn summary_label(answer: &str) -> String {
    let mut label: String = answer.chars().take(SUMMARY_CHARS).collect();
    label.push_str(ELLIPSIS);
    label
}
