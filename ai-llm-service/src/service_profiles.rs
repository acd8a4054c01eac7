//! Shared LLM service with two profiles: `generation` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Provider clients are built eagerly; both profiles share one client when
//!   their configs are identical.
//! - Every outbound call is wrapped in the configured [`RetryPolicy`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{EmbeddingIntent, LlmServiceProfiles};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ai_llm_service::AiLlmError> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//!     let q = svc.embed("Who betrayed the captain?", EmbeddingIntent::Query).await?;
//!     println!("query dim = {}", q.len());
//!
//!     let answer = svc.generate("Say hello").await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::{
    EmbeddingIntent,
    config::{
        default_config::{embedding_config_from_env, generation_config_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    retry::{RetryPolicy, with_retry},
    services::{gemini_service::GeminiService, ollama_service::OllamaService},
};

/// Provider client behind a profile.
#[derive(Debug)]
enum Client {
    Ollama(OllamaService),
    Gemini(GeminiService),
}

impl Client {
    fn new(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => Client::Ollama(OllamaService::new(cfg.clone())?),
            LlmProvider::Gemini => Client::Gemini(GeminiService::new(cfg.clone())?),
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        match self {
            Client::Ollama(c) => c.generate(prompt).await,
            Client::Gemini(c) => c.generate(prompt).await,
        }
    }

    async fn embed(&self, input: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, AiLlmError> {
        match self {
            Client::Ollama(c) => c.embeddings(input, intent).await,
            Client::Gemini(c) => c.embeddings(input, intent).await,
        }
    }

    async fn embed_batch(
        &self,
        inputs: &[String],
        intent: EmbeddingIntent,
    ) -> Result<Vec<Vec<f32>>, AiLlmError> {
        match self {
            Client::Ollama(c) => c.embed_batch(inputs, intent).await,
            Client::Gemini(c) => c.embed_batch(inputs, intent).await,
        }
    }
}

/// Shared service managing the **generation** and **embedding** profiles.
#[derive(Debug)]
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    embedding: LlmModelConfig,
    retry: RetryPolicy,

    generation_client: Arc<Client>,
    embedding_client: Arc<Client>,
}

impl LlmServiceProfiles {
    /// Creates the service and its provider clients.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if a profile is invalid for its provider
    /// (bad endpoint, missing API key) or an HTTP client cannot be built.
    pub fn new(
        generation: LlmModelConfig,
        embedding: LlmModelConfig,
        retry: RetryPolicy,
    ) -> Result<Self, AiLlmError> {
        let generation_client = Arc::new(Client::new(&generation)?);
        let embedding_client = if embedding == generation {
            Arc::clone(&generation_client)
        } else {
            Arc::new(Client::new(&embedding)?)
        };

        info!(
            generation_provider = %generation.provider,
            generation_model = %generation.model,
            embedding_provider = %embedding.provider,
            embedding_model = %embedding.model,
            max_attempts = retry.max_attempts,
            "LLM profiles ready"
        );

        Ok(Self {
            generation,
            embedding,
            retry,
            generation_client,
            embedding_client,
        })
    }

    /// Builds both profiles and the retry policy from environment variables.
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(
            generation_config_from_env()?,
            embedding_config_from_env()?,
            RetryPolicy::from_env()?,
        )
    }

    /// Generates text using the **generation** profile.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        with_retry(&self.retry, "generate", || self.generation_client.generate(prompt)).await
    }

    /// Embeds a single text using the **embedding** profile.
    pub async fn embed(&self, input: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, AiLlmError> {
        with_retry(&self.retry, "embed", || self.embedding_client.embed(input, intent)).await
    }

    /// Embeds a batch; the result is aligned with `inputs` or the call fails as a whole.
    pub async fn embed_batch(
        &self,
        inputs: &[String],
        intent: EmbeddingIntent,
    ) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(&self.retry, "embed_batch", || {
            self.embedding_client.embed_batch(inputs, intent)
        })
        .await
    }

    /// Returns references to the current profiles `(generation, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.generation, &self.embedding)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
