use std::fmt;

use crate::config::llm_provider::LlmProvider;

/// Configuration for one model invocation profile.
///
/// # Fields
///
/// - `provider`: which backend to use (Ollama, Gemini).
/// - `model`: model identifier (e.g. `"gemini-1.5-flash"`, `"nomic-embed-text"`).
/// - `endpoint`: base URL of the provider API.
/// - `api_key`: optional key for providers that require authentication.
/// - `max_tokens`, `temperature`, `top_p`: generation knobs (ignored for embeddings).
/// - `timeout_secs`: per-request HTTP timeout.
/// - `query_prefix` / `document_prefix`: text prepended per embedding intent
///   for models that encode the intent in the input (e.g. `search_query: `).
///
/// `Debug` never prints the API key.
#[derive(Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub query_prefix: Option<String>,
    pub document_prefix: Option<String>,
}

impl fmt::Debug for LlmModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("timeout_secs", &self.timeout_secs)
            .field("query_prefix", &self.query_prefix)
            .field("document_prefix", &self.document_prefix)
            .finish()
    }
}
