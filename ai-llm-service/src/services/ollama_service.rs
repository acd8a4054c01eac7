//! Lightweight Ollama service for text generation and embeddings.
//!
//! This module implements a thin client for the local Ollama API:
//! - `POST {endpoint}/api/generate`: synchronous text generation (`stream=false`)
//! - `POST {endpoint}/api/embed`: batch embeddings (`input: [..]`)
//!
//! Ollama has no notion of embedding intent, so the intent is expressed with
//! the configured text prefixes (see [`LlmModelConfig::query_prefix`]).

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    EmbeddingIntent,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind},
    services::{
        DEFAULT_TIMEOUT, check_batch, ensure_success, normalized_endpoint, transport_error,
        with_intent_prefix,
    },
};

/// Thin client for Ollama.
///
/// Initialized with a full [`LlmModelConfig`]. Reuses an HTTP client with
/// a configurable timeout.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    timeout: Duration,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embed: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not `Ollama`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into());
        }
        let base = normalized_endpoint(Provider::Ollama, &cfg)?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            timeout,
            url_generate: format!("{base}/api/generate"),
            url_embed: format!("{base}/api/embed"),
            cfg,
        })
    }

    /// Performs a **non-streaming** generation request via `/api/generate`.
    ///
    /// Mapped options:
    /// - `num_predict`  ← `self.cfg.max_tokens`
    /// - `temperature`  ← `self.cfg.temperature`
    /// - `top_p`        ← `self.cfg.top_p`
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = GenerateRequest::from_cfg(&self.cfg, prompt);

        debug!(prompt_len = prompt.len(), "POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp = ensure_success(Provider::Ollama, &self.url_generate, resp).await?;

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!("serde error: {e}; ensure `stream=false` is used")),
            )
        })?;

        if out.response.trim().is_empty() {
            return Err(ProviderError::new(Provider::Ollama, ProviderErrorKind::EmptyChoices).into());
        }
        debug!(latency_ms = started.elapsed().as_millis() as u64, "generation completed");
        Ok(out.response)
    }

    /// Embeds a batch of texts via `/api/embed`, preserving input order.
    ///
    /// The whole batch fails if the response does not carry exactly one
    /// vector per input.
    #[instrument(skip_all, fields(model = %self.cfg.model, intent = %intent, batch = inputs.len()))]
    pub async fn embed_batch(
        &self,
        inputs: &[String],
        intent: EmbeddingIntent,
    ) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let prepared: Vec<String> = inputs
            .iter()
            .map(|t| with_intent_prefix(&self.cfg, intent, t).into_owned())
            .collect();
        let body = EmbedRequest {
            model: &self.cfg.model,
            input: &prepared,
        };

        debug!("POST {}", self.url_embed);
        let resp = self
            .client
            .post(&self.url_embed)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp = ensure_success(Provider::Ollama, &self.url_embed, resp).await?;

        let out: EmbedResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `{{ embeddings: number[][] }}`")),
            )
        })?;

        check_batch(Provider::Ollama, inputs.len(), &out.embeddings)?;
        debug!(latency_ms = started.elapsed().as_millis() as u64, "embeddings completed");
        Ok(out.embeddings)
    }

    /// Embeds a single text.
    pub async fn embeddings(&self, input: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, AiLlmError> {
        let mut out = self.embed_batch(&[input.to_string()], intent).await?;
        out.pop().ok_or_else(|| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::CountMismatch { expected: 1, got: 0 },
            )
            .into()
        })
    }
}

/* ==========================
HTTP payloads & options
========================== */

/// Request body for `/api/generate` (non-streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        let options = GenerateOptions {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            num_predict: cfg.max_tokens,
        };

        Self {
            model: &cfg.model,
            prompt,
            stream: false,
            options: Some(options),
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body for `/api/generate`; the generated text is in `response`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Request body for `/api/embed`.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body for `/api/embed`.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "qwen3:14b".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: Some(256),
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(30),
            query_prefix: None,
            document_prefix: None,
        }
    }

    #[test]
    fn rejects_foreign_provider() {
        let c = LlmModelConfig {
            provider: LlmProvider::Gemini,
            ..cfg()
        };
        assert!(OllamaService::new(c).is_err());
    }

    #[test]
    fn generate_request_is_non_streaming_with_options() {
        let c = cfg();
        let v = serde_json::to_value(GenerateRequest::from_cfg(&c, "hi")).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["model"], "qwen3:14b");
        assert_eq!(v["options"]["num_predict"], 256);
        assert!(v["options"].get("top_p").is_none());
    }

    #[test]
    fn embed_response_decodes_batch() {
        let raw = r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
        let out: EmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.embeddings.len(), 2);
        assert_eq!(out.embeddings[1], vec![0.3, 0.4]);
    }
}
