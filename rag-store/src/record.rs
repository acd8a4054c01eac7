//! Core data models used by the library.

use serde::{Deserialize, Serialize};

use crate::errors::RagError;

/// A contiguous slice of the source text, optionally embedded.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub id: String,
    /// Start of the chunk in the source, in characters.
    pub source_offset: usize,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Converts an embedded chunk into its stored form.
    ///
    /// # Errors
    /// `EmbeddingFailure` if the chunk has no vector; a chunk is never indexed without one.
    pub fn into_record(self) -> Result<VectorRecord, RagError> {
        let embedding = self.embedding.ok_or_else(|| {
            RagError::EmbeddingFailure(format!("chunk {} has no embedding", self.id))
        })?;
        Ok(VectorRecord {
            id: self.id,
            text: self.text,
            embedding,
        })
    }
}

/// Persisted form of a chunk inside a vector index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A single retrieval hit. Hits are returned best-first.
#[derive(Clone, Debug, PartialEq)]
pub struct RagHit {
    pub id: String,
    pub text: String,
    pub score: f32,
}
