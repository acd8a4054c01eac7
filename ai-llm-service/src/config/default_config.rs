//! Default model configs loaded strictly from environment variables.
//!
//! Two roles are configured:
//!
//! - **Generation** → answers questions from the assembled prompt
//! - **Embedding**  → vectors for corpus passages and questions
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`        = provider for both roles (`gemini` by default, or `ollama`)
//! - `EMBEDDING_KIND`  = optional provider override for the embedding role
//! - `LLM_MAX_TOKENS`  = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS` = optional per-request timeout (u64)
//! - `EMBED_QUERY_PREFIX` / `EMBED_DOCUMENT_PREFIX` = optional intent prefixes (Ollama)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = generation model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! Gemini-specific:
//! - `GEMINI_API_KEY`         = API key (mandatory)
//! - `GEMINI_URL`             = base URL (default `https://generativelanguage.googleapis.com`)
//! - `GEMINI_MODEL`           = generation model (default `gemini-1.5-flash`)
//! - `GEMINI_EMBEDDING_MODEL` = embedding model (default `text-embedding-004`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint,
    },
};

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
const GEMINI_DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Provider selected by `LLM_KIND` (defaults to Gemini).
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match env_opt("LLM_KIND") {
        Some(kind) => Ok(kind.parse()?),
        None => Ok(LlmProvider::Gemini),
    }
}

/// Generation profile for the provider selected by `LLM_KIND`.
pub fn generation_config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::Ollama => config_ollama_generation(),
        LlmProvider::Gemini => config_gemini_generation(),
    }
}

/// Embedding profile for `EMBEDDING_KIND`, falling back to `LLM_KIND`.
pub fn embedding_config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = match env_opt("EMBEDDING_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => provider_from_env()?,
    };
    match provider {
        LlmProvider::Ollama => config_ollama_embedding(),
        LlmProvider::Gemini => config_gemini_embedding(),
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn gemini_endpoint() -> Result<String, AiLlmError> {
    let url = env_opt("GEMINI_URL").unwrap_or_else(|| GEMINI_DEFAULT_URL.to_string());
    validate_http_endpoint("GEMINI_URL", &url)?;
    Ok(url)
}

fn timeout_secs(default: u64) -> Result<Option<u64>, AiLlmError> {
    Ok(Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(default)))
}

/// Ollama generation model (`OLLAMA_MODEL`).
///
/// # Defaults
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(120)`
pub fn config_ollama_generation() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: timeout_secs(120)?,
        query_prefix: None,
        document_prefix: None,
    })
}

/// Ollama embedding model (`EMBEDDING_MODEL`).
///
/// Intent prefixes come from `EMBED_QUERY_PREFIX` / `EMBED_DOCUMENT_PREFIX`
/// (e.g. `search_query: ` and `search_document: ` for nomic-embed-text).
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: timeout_secs(30)?,
        query_prefix: env_opt("EMBED_QUERY_PREFIX"),
        document_prefix: env_opt("EMBED_DOCUMENT_PREFIX"),
    })
}

/// Gemini generation model (`GEMINI_MODEL`, default `gemini-1.5-flash`).
pub fn config_gemini_generation() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model: env_opt("GEMINI_MODEL").unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
        endpoint: gemini_endpoint()?,
        api_key: Some(must_env("GEMINI_API_KEY")?),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.4),
        top_p: None,
        timeout_secs: timeout_secs(60)?,
        query_prefix: None,
        document_prefix: None,
    })
}

/// Gemini embedding model (`GEMINI_EMBEDDING_MODEL`, default `text-embedding-004`).
///
/// Intent is sent as `taskType`; `EMBED_*_PREFIX` is ignored for this provider.
pub fn config_gemini_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model: env_opt("GEMINI_EMBEDDING_MODEL")
            .unwrap_or_else(|| GEMINI_DEFAULT_EMBEDDING_MODEL.to_string()),
        endpoint: gemini_endpoint()?,
        api_key: Some(must_env("GEMINI_API_KEY")?),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: timeout_secs(30)?,
        query_prefix: None,
        document_prefix: None,
    })
}
