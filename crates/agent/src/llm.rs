use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single generation call, classified the way the refiner's
/// fallback policy needs it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("model `{model}` not found or unsupported: {message}")]
    ModelNotFound { model: String, message: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "model_not_found",
            Self::RateLimited(_) => "rate_limited",
            Self::Transport(_) => "transport",
            Self::Upstream { .. } => "upstream",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the raw text of the first candidate.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}
