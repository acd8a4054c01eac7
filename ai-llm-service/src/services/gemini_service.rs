//! Gemini (Google Generative Language API) service for generation and embeddings.
//!
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1beta/models/{model}:generateContent
//! - POST {endpoint}/v1beta/models/{model}:embedContent
//! - POST {endpoint}/v1beta/models/{model}:batchEmbedContents
//!
//! Embedding intent maps to `taskType` (`RETRIEVAL_QUERY` / `RETRIEVAL_DOCUMENT`);
//! the text prefixes configured for prefix-based models are not applied.
//! The API key travels in the `x-goog-api-key` header, so request URLs that
//! end up in logs and errors never contain it.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    EmbeddingIntent,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind},
    services::{DEFAULT_TIMEOUT, check_batch, ensure_success, normalized_endpoint, transport_error},
};

/// Upper bound of `requests` accepted by `batchEmbedContents`.
const MAX_BATCH: usize = 100;

/// Thin client for the Gemini REST API.
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    timeout: Duration,
    cfg: LlmModelConfig,
    model_path: String,
    url_generate: String,
    url_embed: String,
    url_batch_embed: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not Gemini
    /// - `MissingApiKey` if `cfg.api_key` is `None`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Gemini {
            return Err(ProviderError::new(Provider::Gemini, ProviderErrorKind::InvalidProvider).into());
        }
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::new(Provider::Gemini, ProviderErrorKind::MissingApiKey))?;
        let base = normalized_endpoint(Provider::Gemini, &cfg)?;

        let mut headers = header::HeaderMap::new();
        let mut key_value = header::HeaderValue::from_str(api_key.trim()).map_err(|e| {
            ProviderError::new(
                Provider::Gemini,
                ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
            )
        })?;
        key_value.set_sensitive(true);
        headers.insert("x-goog-api-key", key_value);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let timeout = cfg.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()?;

        let model_path = model_path(&cfg.model);
        info!(
            model = %cfg.model,
            endpoint = %base,
            timeout_secs = timeout.as_secs(),
            "GeminiService initialized"
        );

        Ok(Self {
            client,
            timeout,
            url_generate: format!("{base}/v1beta/{model_path}:generateContent"),
            url_embed: format!("{base}/v1beta/{model_path}:embedContent"),
            url_batch_embed: format!("{base}/v1beta/{model_path}:batchEmbedContents"),
            model_path,
            cfg,
        })
    }

    /// Single, non-streaming `generateContent` call.
    ///
    /// Returns the concatenated text parts of the first candidate.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = GenerateContentRequest::from_cfg(&self.cfg, prompt);

        debug!(prompt_len = prompt.len(), "POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp = ensure_success(Provider::Gemini, &self.url_generate, resp).await?;

        let out: GenerateContentResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Gemini,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `candidates[0].content.parts[].text`"
                )),
            )
        })?;

        let text = out
            .first_text()
            .ok_or_else(|| ProviderError::new(Provider::Gemini, ProviderErrorKind::EmptyChoices))?;

        info!(
            latency_ms = started.elapsed().as_millis() as u64,
            "generateContent completed"
        );
        Ok(text)
    }

    /// Embeds a single text with `embedContent`.
    #[instrument(skip_all, fields(model = %self.cfg.model, intent = %intent))]
    pub async fn embeddings(&self, input: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, AiLlmError> {
        let body = EmbedContentRequest::new(&self.model_path, input, intent);

        debug!(input_len = input.len(), "POST {}", self.url_embed);
        let resp = self
            .client
            .post(&self.url_embed)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp = ensure_success(Provider::Gemini, &self.url_embed, resp).await?;

        let out: EmbedContentResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Gemini,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `embedding.values`")),
            )
        })?;
        check_batch(Provider::Gemini, 1, std::slice::from_ref(&out.embedding.values))?;
        Ok(out.embedding.values)
    }

    /// Embeds a batch with `batchEmbedContents`, preserving input order.
    ///
    /// Inputs larger than the API limit are sent as consecutive requests; any
    /// failure fails the whole batch.
    #[instrument(skip_all, fields(model = %self.cfg.model, intent = %intent, batch = inputs.len()))]
    pub async fn embed_batch(
        &self,
        inputs: &[String],
        intent: EmbeddingIntent,
    ) -> Result<Vec<Vec<f32>>, AiLlmError> {
        let started = Instant::now();
        let mut out = Vec::with_capacity(inputs.len());

        for part in inputs.chunks(MAX_BATCH) {
            let body = BatchEmbedRequest {
                requests: part
                    .iter()
                    .map(|t| EmbedContentRequest::new(&self.model_path, t, intent))
                    .collect(),
            };

            debug!(requests = part.len(), "POST {}", self.url_batch_embed);
            let resp = self
                .client
                .post(&self.url_batch_embed)
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error(e, self.timeout))?;
            let resp = ensure_success(Provider::Gemini, &self.url_batch_embed, resp).await?;

            let parsed: BatchEmbedResponse = resp.json().await.map_err(|e| {
                ProviderError::new(
                    Provider::Gemini,
                    ProviderErrorKind::Decode(format!("serde error: {e}; expected `embeddings[].values`")),
                )
            })?;
            let vectors: Vec<Vec<f32>> = parsed.embeddings.into_iter().map(|e| e.values).collect();
            check_batch(Provider::Gemini, part.len(), &vectors)?;
            out.extend(vectors);
        }

        check_batch(Provider::Gemini, inputs.len(), &out)?;
        debug!(latency_ms = started.elapsed().as_millis() as u64, "batch embeddings completed");
        Ok(out)
    }
}

/// `text-embedding-004` → `models/text-embedding-004`.
fn model_path(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") || m.starts_with("tunedModels/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_cfg(cfg: &LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                max_output_tokens: cfg.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

impl<'a> EmbedContentRequest<'a> {
    fn new(model: &'a str, text: &'a str, intent: EmbeddingIntent) -> Self {
        Self {
            model,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: intent.gemini_task_type(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Gemini,
            model: "text-embedding-004".into(),
            endpoint: "https://generativelanguage.googleapis.com/".into(),
            api_key: Some("test-key".into()),
            max_tokens: Some(512),
            temperature: Some(0.4),
            top_p: None,
            timeout_secs: Some(30),
            query_prefix: None,
            document_prefix: None,
        }
    }

    #[test]
    fn urls_use_model_path_and_never_the_key() {
        let svc = GeminiService::new(cfg()).unwrap();
        assert_eq!(
            svc.url_batch_embed,
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents"
        );
        assert!(!svc.url_generate.contains("test-key"));
        assert!(!format!("{svc:?}").contains("test-key"));
    }

    #[test]
    fn requires_api_key() {
        let c = LlmModelConfig {
            api_key: None,
            ..cfg()
        };
        assert!(GeminiService::new(c).is_err());
    }

    #[test]
    fn embed_request_carries_task_type() {
        let req = EmbedContentRequest::new("models/text-embedding-004", "Who is Bella?", EmbeddingIntent::Query);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(v["content"]["parts"][0]["text"], "Who is Bella?");
        assert!(v["content"].get("role").is_none());

        let doc = EmbedContentRequest::new("models/text-embedding-004", "chunk", EmbeddingIntent::Document);
        assert_eq!(serde_json::to_value(&doc).unwrap()["taskType"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn generate_request_maps_generation_config() {
        let c = cfg();
        let v = serde_json::to_value(GenerateContentRequest::from_cfg(&c, "prompt")).unwrap();
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 512);
        assert!(v["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn first_text_joins_parts_and_rejects_empty() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Bella "},{"text":"is a spy."}]}}]}"#;
        let out: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.first_text().as_deref(), Some("Bella is a spy."));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.first_text().is_none());
    }

    /// Serves `batchEmbedContents` on an ephemeral port; text `t{n}` embeds as `[n, 1]`.
    /// Records the texts of every request.
    async fn fake_batch_endpoint(seen: Arc<Mutex<Vec<Vec<String>>>>) -> String {
        let app = Router::new().fallback(move |Json(body): Json<Value>| async move {
            let texts: Vec<String> = body["requests"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|r| r["content"]["parts"][0]["text"].as_str().unwrap_or_default().to_string())
                .collect();
            let embeddings: Vec<Value> = texts
                .iter()
                .map(|t| {
                    let n: f32 = t.trim_start_matches('t').parse().unwrap_or(-1.0);
                    json!({ "values": [n, 1.0] })
                })
                .collect();
            seen.lock().unwrap().push(texts);
            Json(json!({ "embeddings": embeddings }))
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn large_batch_is_split_and_keeps_input_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let svc = GeminiService::new(LlmModelConfig {
            endpoint: fake_batch_endpoint(seen.clone()).await,
            query_prefix: Some("search_query: ".into()),
            document_prefix: Some("search_document: ".into()),
            ..cfg()
        })
        .unwrap();

        let inputs: Vec<String> = (0..250).map(|i| format!("t{i}")).collect();
        let out = svc.embed_batch(&inputs, EmbeddingIntent::Document).await.unwrap();
        assert_eq!(out.len(), 250);
        assert!(out.iter().enumerate().all(|(i, v)| v[0] == i as f32));

        let seen = seen.lock().unwrap();
        let sizes: Vec<usize> = seen.iter().map(Vec::len).collect();
        assert_eq!(sizes, [100, 100, 50]);
        // intent travels as taskType only
        assert_eq!(seen[1][0], "t100");
    }

    #[test]
    fn model_path_is_prefixed_once() {
        assert_eq!(model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(model_path("models/gemini-1.5-flash"), "models/gemini-1.5-flash");
    }
}
