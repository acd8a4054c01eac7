//! Typed error for the contextor crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Steps of answering one question, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Embedded,
    Retrieved,
    Composed,
    Generated,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Embedded => "embedded",
            Stage::Retrieved => "retrieved",
            Stage::Composed => "composed",
            Stage::Generated => "generated",
            Stage::Done => "done",
        })
    }
}

#[derive(Debug, Error)]
pub enum ContextorError {
    /// The question is absent or blank.
    #[error("question is required")]
    MissingInput,

    /// Embedding or generation provider failed (after its own retries).
    #[error("upstream failure while {stage}: {message}")]
    Upstream { stage: Stage, message: String },

    /// A provider call exceeded the per-stage timeout.
    #[error("upstream timeout while {stage} after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    /// Vector index read error.
    #[error("index failure: {0}")]
    Index(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ContextorError {
    /// `true` when the caller can fix the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ContextorError::MissingInput)
    }

    pub(crate) fn upstream(stage: Stage, err: impl fmt::Display) -> Self {
        ContextorError::Upstream {
            stage,
            message: err.to_string(),
        }
    }
}

impl From<rag_store::RagError> for ContextorError {
    fn from(err: rag_store::RagError) -> Self {
        ContextorError::Index(err.to_string())
    }
}
