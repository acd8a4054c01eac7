//! Retrieval-augmented question answering over the plot index.
//!
//! Public API: [`Contextor::handle`]. It validates the question, embeds it
//! with query intent, retrieves the top-K chunks, builds a grounded prompt,
//! calls the generation model, and returns the answer with the context used.
//! Transport adapters (HTTP, serverless events) only translate shapes around
//! this one call.

pub mod cfg;
mod error;
mod llm;
pub mod prompt;

mod api_types;

pub use api_types::{QaAnswer, UsedChunk};
pub use cfg::ContextorConfig;
pub use error::{ContextorError, Stage};
pub use llm::Generator;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use rag_store::{EmbeddingIntent, EmbeddingsProvider, RagHit, VectorIndex};
use tracing::{debug, info, instrument, warn};

/// Question answering pipeline with injected capabilities.
///
/// Holds no per-request state; share it behind an `Arc` and call
/// [`handle`](Self::handle) concurrently.
pub struct Contextor {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    cfg: ContextorConfig,
}

impl Contextor {
    pub fn new(
        embedder: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        cfg: ContextorConfig,
    ) -> Result<Self, ContextorError> {
        cfg.validate()?;
        Ok(Self {
            embedder,
            index,
            generator,
            cfg,
        })
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    /// Answers one question.
    ///
    /// Any failing step stops the pipeline; there are no partial answers.
    ///
    /// # Errors
    /// - `MissingInput` if `question` is absent or blank (no provider is called)
    /// - `Upstream` / `Timeout` if embedding or generation fails
    /// - `Index` if retrieval fails
    #[instrument(skip_all, fields(top_k = self.cfg.top_k))]
    pub async fn handle(&self, question: Option<&str>) -> Result<QaAnswer, ContextorError> {
        let started = Instant::now();

        // Received
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(ContextorError::MissingInput)?;
        debug!(stage = %Stage::Received, question_len = question.len());

        // Embedded
        let qv = self
            .bounded(Stage::Embedded, self.embedder.embed(question, EmbeddingIntent::Query))
            .await?
            .map_err(|e| ContextorError::upstream(Stage::Embedded, e))?;
        debug!(stage = %Stage::Embedded, dim = qv.len());

        // Retrieved
        let hits = self
            .bounded(Stage::Retrieved, self.index.query(&qv, self.cfg.top_k))
            .await??;
        debug!(stage = %Stage::Retrieved, hits = hits.len());

        // Composed
        let context = prompt::join_context(&hits, &self.cfg.separator);
        let grounded = !hits.is_empty();
        if !grounded {
            warn!("no context retrieved, answering with the no-information policy");
        }
        let prompt = prompt::build_prompt(&self.cfg.preamble, &context, question, &self.cfg.no_info_answer);
        debug!(stage = %Stage::Composed, prompt_len = prompt.len(), grounded);

        // Generated
        let answer = if grounded || self.cfg.no_info_via_model {
            let text = self
                .bounded(Stage::Generated, self.generator.generate(&prompt))
                .await??;
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(ContextorError::upstream(Stage::Generated, "model returned an empty answer"));
            }
            text
        } else {
            self.cfg.no_info_answer.clone()
        };
        debug!(stage = %Stage::Generated, answer_len = answer.len());

        info!(
            stage = %Stage::Done,
            hits = hits.len(),
            grounded,
            latency_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );
        Ok(QaAnswer {
            answer,
            context: hits.into_iter().map(used_chunk).collect(),
            grounded,
        })
    }

    /// Convenience wrapper returning only the answer text.
    pub async fn ask(&self, question: &str) -> Result<String, ContextorError> {
        Ok(self.handle(Some(question)).await?.answer)
    }

    /// Applies the per-stage timeout to a provider call.
    async fn bounded<T>(&self, stage: Stage, fut: impl Future<Output = T>) -> Result<T, ContextorError> {
        tokio::time::timeout(self.cfg.stage_timeout, fut)
            .await
            .map_err(|_| {
                warn!(%stage, timeout = ?self.cfg.stage_timeout, "provider call timed out");
                ContextorError::Timeout {
                    stage,
                    after: self.cfg.stage_timeout,
                }
            })
    }
}

fn used_chunk(h: RagHit) -> UsedChunk {
    UsedChunk {
        id: h.id,
        score: h.score,
        text: h.text,
    }
}
