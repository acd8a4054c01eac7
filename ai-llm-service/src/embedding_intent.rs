//! Purpose of an embedding request.
//!
//! Asymmetric retrieval models embed a question and a corpus passage
//! differently. Every embed call carries the intent explicitly.

use std::fmt;

/// Why a text is being embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingIntent {
    /// A user question that will be compared against the corpus.
    Query,
    /// A corpus passage that will be stored in the index.
    Document,
}

impl EmbeddingIntent {
    /// Gemini `taskType` value for this intent.
    pub fn gemini_task_type(self) -> &'static str {
        match self {
            EmbeddingIntent::Query => "RETRIEVAL_QUERY",
            EmbeddingIntent::Document => "RETRIEVAL_DOCUMENT",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingIntent::Query => "query",
            EmbeddingIntent::Document => "document",
        }
    }
}

impl fmt::Display for EmbeddingIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
