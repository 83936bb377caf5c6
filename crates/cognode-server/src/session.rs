//! Per-connection session state machine.
//!
//! A session owns one graph and handles one message at a time. Graph edits
//! are applied immediately; questions go through the model, and the reply
//! is recovered, attached to the graph and streamed back as events.

use crate::error::SessionError;
use crate::protocol::{InboundMessage, OutboundEvent};
use cognode_core::{build_system_prompt, extract_reply, PromptContext, ROOT_ID, ROOT_LABEL};
use cognode_graph::GraphStore;
use cognode_model::ModelClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Whether a model call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingModel,
}

/// Turns client messages into graph mutations and outbound events.
///
/// `handle` takes `&mut self`, so a session can never run two model calls
/// at once; `run` feeds it queued frames strictly in arrival order.
pub struct SessionController {
    id: String,
    graph: GraphStore,
    model: Arc<dyn ModelClient>,
    state: SessionState,
}

impl SessionController {
    pub fn new(graph: GraphStore, model: Arc<dyn ModelClient>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            graph,
            model,
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Handles one raw text frame.
    pub async fn handle_frame(&mut self, frame: &str) -> Vec<OutboundEvent> {
        self.handle(InboundMessage::parse(frame)).await
    }

    /// Handles one message and returns every event it produces, in order.
    ///
    /// Edits with missing or invalid fields produce nothing. A failed
    /// question produces exactly one error event.
    pub async fn handle(&mut self, message: InboundMessage) -> Vec<OutboundEvent> {
        debug!(session = %self.id, kind = message.kind(), "Handling message");

        match message {
            InboundMessage::AddNode { label, parent_id } => {
                self.add_node(label.as_deref(), parent_id.as_deref())
            }
            InboundMessage::DeleteNode { node_id } => self.delete_node(node_id.as_deref()),
            InboundMessage::UpdateNode { node_id, label } => {
                self.update_node(node_id.as_deref(), label.as_deref())
            }
            InboundMessage::Question {
                question,
                current_node_id,
            } => match self.ask(&question, current_node_id.as_deref()).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(session = %self.id, error = %e, "Question failed");
                    vec![OutboundEvent::error(&e)]
                }
            },
        }
    }

    fn add_node(&mut self, label: Option<&str>, parent_id: Option<&str>) -> Vec<OutboundEvent> {
        let (Some(label), Some(parent_id)) = (non_empty(label), non_empty(parent_id)) else {
            debug!(session = %self.id, "add_node without label or parent_id, ignoring");
            return Vec::new();
        };

        let node = self.graph.add_node(label, Some(parent_id), None);
        vec![OutboundEvent::node_added(node)]
    }

    fn delete_node(&mut self, node_id: Option<&str>) -> Vec<OutboundEvent> {
        let Some(node_id) = non_empty(node_id) else {
            debug!(session = %self.id, "delete_node without node_id, ignoring");
            return Vec::new();
        };
        if node_id == ROOT_ID {
            debug!(session = %self.id, "Refusing to delete the root node");
            return Vec::new();
        }

        self.graph
            .delete_subtree(node_id)
            .into_iter()
            .map(OutboundEvent::node_deleted)
            .collect()
    }

    fn update_node(&mut self, node_id: Option<&str>, label: Option<&str>) -> Vec<OutboundEvent> {
        let (Some(node_id), Some(label)) = (non_empty(node_id), non_empty(label)) else {
            debug!(session = %self.id, "update_node without node_id or label, ignoring");
            return Vec::new();
        };

        match self.graph.update_label(node_id, label) {
            Ok(node) => vec![OutboundEvent::node_updated(node.clone())],
            Err(e) => {
                debug!(session = %self.id, error = %e, "update_node ignored");
                Vec::new()
            }
        }
    }

    /// Answers a question and attaches the proposed nodes.
    ///
    /// Nothing is emitted until the whole reply has been applied, so the
    /// caller either gets the complete event list or a single error.
    async fn ask(
        &mut self,
        question: &str,
        context_id: Option<&str>,
    ) -> Result<Vec<OutboundEvent>, SessionError> {
        if context_id == Some(ROOT_ID) && !self.graph.contains(ROOT_ID) {
            self.graph.add_node(ROOT_LABEL, None, Some(ROOT_ID));
            info!(session = %self.id, "Bootstrapped root node");
        }

        let context = context_id
            .and_then(|id| PromptContext::from_path(&self.graph.get_path_to_node(id)));
        let system_prompt = build_system_prompt(context.as_ref());

        self.state = SessionState::AwaitingModel;
        let result = self.model.complete(&system_prompt, question).await;
        self.state = SessionState::Idle;
        let completion = result?;

        let extraction = extract_reply(&completion.text);
        debug!(
            session = %self.id,
            extraction = extraction.kind(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "Model replied"
        );
        let reply = extraction.into_reply().finalize(context_id);

        let mut events = Vec::with_capacity(reply.nodes.len() + 1);
        events.push(OutboundEvent::chat(reply.answer));
        for proposed in reply.nodes {
            let node = self
                .graph
                .add_node(proposed.label, proposed.parent.as_deref(), None);
            events.push(OutboundEvent::node_added(node));
        }

        Ok(events)
    }

    /// Processes queued frames one at a time until the queue closes or the
    /// outbound side goes away.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<String>,
        outbound: mpsc::UnboundedSender<OutboundEvent>,
    ) {
        while let Some(frame) = inbound.recv().await {
            for event in self.handle_frame(&frame).await {
                if outbound.send(event).is_err() {
                    debug!(session = %self.id, "Outbound channel closed");
                    return;
                }
            }
        }
        debug!(session = %self.id, nodes = self.graph.len(), "Inbound queue closed");
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
