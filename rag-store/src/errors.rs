//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or pipeline parameters that would make no progress.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Embedding provider failed for a whole batch (after retries).
    #[error("embedding failure: {0}")]
    EmbeddingFailure(String),

    /// Storage write or read error.
    #[error("index failure: {0}")]
    IndexFailure(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl From<ai_llm_service::AiLlmError> for RagError {
    fn from(err: ai_llm_service::AiLlmError) -> Self {
        RagError::EmbeddingFailure(err.to_string())
    }
}
