use axum::async_trait;
use thiserror::Error;

use crate::meals::prompt::GenerationRequest;

pub mod openai;

pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to the generator failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generator returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("generator response could not be decoded: {0}")]
    Decode(String),

    #[error("generator response has no message content")]
    MissingContent,
}

/// A text-generation backend. One call is one attempt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw message content of the first completion.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, TransportError>;
}
