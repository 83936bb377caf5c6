use crate::error::ModelCallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw result of one completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Reply text exactly as the model produced it.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Something that can answer a prompt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Runs one completion.
    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Completion, ModelCallError>;
}
