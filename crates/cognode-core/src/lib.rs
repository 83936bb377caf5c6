//! Cognode Core - cognitive nodes and model reply recovery
//!
//! This crate holds the pieces every other Cognode crate agrees on:
//! the `CognitiveNode` record, the prompt that asks a language model to
//! decompose a question, and the extractor that turns whatever the model
//! sends back into a structured reply.
//!
//! # Example
//!
//! ```
//! use cognode_core::{extract_reply, ModelReply};
//!
//! let extraction = extract_reply(r#"Sure! {"answer":"x","nodes":[]} thanks"#);
//! let reply: ModelReply = extraction.into_reply();
//! assert_eq!(reply.answer, "x");
//! ```

pub mod extract;
pub mod node;
pub mod prompt;

pub use extract::{extract_reply, Extraction, ModelReply, ProposedNode};
pub use node::{CognitiveNode, ROOT_ID, ROOT_LABEL};
pub use prompt::{build_system_prompt, PromptContext};
