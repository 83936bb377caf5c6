//! Cognode Model - language model completion client
//!
//! Sessions only need one thing from a model: given a system prompt and
//! the user's text, return the reply text and its token counts. This crate
//! defines that seam as the `ModelClient` trait and provides:
//!
//! - `OpenAiClient` for OpenAI-compatible and Azure chat-completions APIs
//! - `RetryingClient`, which retries transient failures with exponential
//!   backoff around any other client
//! - `ScriptedClient`, a canned-reply client for tests (`testing` feature)

mod client;
mod error;
mod openai;
mod retry;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use client::{Completion, ModelClient};
pub use error::ModelCallError;
pub use openai::{ApiMode, ModelConfig, OpenAiClient};
pub use retry::{RetryPolicy, RetryingClient};
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedClient;
