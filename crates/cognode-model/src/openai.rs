//! OpenAI-compatible chat-completions client.
//!
//! Speaks the plain OpenAI API (and the many services that clone it) as well
//! as Azure OpenAI deployments, which differ only in URL layout and auth
//! header.

use crate::client::{Completion, ModelClient};
use crate::error::ModelCallError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Which URL and auth scheme to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMode {
    #[default]
    Openai,
    Azure,
}

/// Settings for `OpenAiClient`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub mode: ApiMode,

    /// Model name, or deployment name in Azure mode.
    pub model: String,

    /// Base URL. Required in Azure mode.
    pub api_base: Option<String>,

    /// Azure `api-version` query parameter. Required in Azure mode.
    pub api_version: Option<String>,

    /// Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,

    /// Whole-request timeout.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            mode: ApiMode::Openai,
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_version: None,
            api_key: None,
            temperature: 0.0,
            top_p: 0.1,
            max_tokens: 16384,
            timeout_secs: 300,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ModelConfig {
    /// Full chat-completions URL for this configuration.
    pub fn endpoint(&self) -> Result<String, ModelCallError> {
        match self.mode {
            ApiMode::Openai => {
                let base = self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
                Ok(format!("{}/chat/completions", base.trim_end_matches('/')))
            }
            ApiMode::Azure => {
                let (Some(base), Some(version)) = (&self.api_base, &self.api_version) else {
                    return Err(ModelCallError::Config(
                        "azure mode requires api_base and api_version".to_string(),
                    ));
                };
                Ok(format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    base.trim_end_matches('/'),
                    self.model,
                    version
                ))
            }
        }
    }

    fn headers(&self) -> Result<HeaderMap, ModelCallError> {
        let key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ModelCallError::Config("missing API key".to_string()))?;

        let (name, value) = match self.mode {
            ApiMode::Openai => (AUTHORIZATION, format!("Bearer {}", key)),
            ApiMode::Azure => (HeaderName::from_static("api-key"), key.to_string()),
        };
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            ModelCallError::Config("API key contains invalid header characters".to_string())
        })?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(name, value);
        Ok(headers)
    }
}

/// Chat-completions client for OpenAI-compatible and Azure endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    config: ModelConfig,
}

impl OpenAiClient {
    /// Validates the configuration and builds the HTTP client.
    pub fn new(config: ModelConfig) -> Result<Self, ModelCallError> {
        let endpoint = config.endpoint()?;
        let http = reqwest::Client::builder()
            .default_headers(config.headers()?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Completion, ModelCallError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_input,
                },
            ],
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
        };

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ModelCallError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ModelCallError::MalformedResponse("completion has no message content".to_string())
            })?;
        let usage = parsed.usage.unwrap_or_default();

        debug!(
            model = %self.config.model,
            latency_ms = start.elapsed().as_millis() as u64,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Completion received"
        );

        Ok(Completion {
            text,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
