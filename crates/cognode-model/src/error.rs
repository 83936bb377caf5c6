//! Error types for model calls.

use thiserror::Error;

/// Things that can go wrong when calling a model.
#[derive(Error, Debug)]
pub enum ModelCallError {
    /// The client was configured in a way that can never work.
    #[error("invalid model configuration: {0}")]
    Config(String),

    /// The request never got a response: DNS, TLS, connection reset, timeout.
    #[error("request to model API failed")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("model API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered 200 but the body is not a usable completion.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ModelCallError>,
    },
}

impl ModelCallError {
    /// Whether trying the same request again might succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::MalformedResponse(_) | Self::Exhausted { .. } => false,
        }
    }
}
