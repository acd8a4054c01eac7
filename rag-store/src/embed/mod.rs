//! Embedding capability consumed by ingestion and retrieval.

use std::sync::Arc;

use ai_llm_service::{EmbeddingIntent, LlmServiceProfiles};
use futures::future::BoxFuture;
use tracing::debug;

use crate::errors::RagError;

/// Provider interface for embedding generation.
///
/// Every call carries an explicit [`EmbeddingIntent`]. Implementations must
/// return one vector per input, in input order, or fail the whole batch.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
        intent: EmbeddingIntent,
    ) -> BoxFuture<'a, Result<Vec<f32>, RagError>>;

    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
        intent: EmbeddingIntent,
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>>;
}

/// [`EmbeddingsProvider`] backed by the shared LLM profiles.
#[derive(Clone, Debug)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected dimension; unchecked when `None`.
    dim: Option<usize>,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }

    fn check_dim(&self, v: &[f32]) -> Result<(), RagError> {
        match self.dim {
            Some(want) if v.len() != want => Err(RagError::VectorSizeMismatch {
                got: v.len(),
                want,
            }),
            _ => Ok(()),
        }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
        intent: EmbeddingIntent,
    ) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
        Box::pin(async move {
            let v = self.svc.embed(text, intent).await?;
            self.check_dim(&v)?;
            Ok(v)
        })
    }

    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
        intent: EmbeddingIntent,
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        Box::pin(async move {
            let vectors = self.svc.embed_batch(texts, intent).await?;
            if vectors.len() != texts.len() {
                return Err(RagError::EmbeddingFailure(format!(
                    "provider returned {} vectors for {} inputs",
                    vectors.len(),
                    texts.len()
                )));
            }
            for v in &vectors {
                self.check_dim(v)?;
            }
            debug!(batch = texts.len(), %intent, "batch embedded");
            Ok(vectors)
        })
    }
}
