//! Provider clients.

pub mod gemini_service;
pub mod ollama_service;

use std::borrow::Cow;
use std::time::Duration;

use tracing::error;

use crate::{
    EmbeddingIntent,
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet},
};

/// Default HTTP timeout when the config does not specify one.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Validates that the endpoint uses http/https and returns it without a trailing slash.
pub(crate) fn normalized_endpoint(
    provider: Provider,
    cfg: &LlmModelConfig,
) -> Result<String, AiLlmError> {
    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty() || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Returns the response unchanged on 2xx, otherwise a provider `HttpStatus` error.
pub(crate) async fn ensure_success(
    provider: Provider,
    url: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);
    error!(%provider, %status, %url, %snippet, "provider returned non-success status");
    Err(ProviderError::new(
        provider,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url: url.to_string(),
            snippet,
        }),
    )
    .into())
}

/// Maps a transport error, keeping client-side timeouts distinct.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> AiLlmError {
    if err.is_timeout() {
        AiLlmError::Timeout(timeout)
    } else {
        AiLlmError::HttpTransport(err)
    }
}

/// Prepends the configured intent prefix, if any.
pub(crate) fn with_intent_prefix<'a>(
    cfg: &LlmModelConfig,
    intent: EmbeddingIntent,
    text: &'a str,
) -> Cow<'a, str> {
    let prefix = match intent {
        EmbeddingIntent::Query => cfg.query_prefix.as_deref(),
        EmbeddingIntent::Document => cfg.document_prefix.as_deref(),
    };
    match prefix {
        Some(p) if !p.is_empty() => Cow::Owned(format!("{p}{text}")),
        _ => Cow::Borrowed(text),
    }
}

/// Checks that a batch response has one vector per input and a single dimension.
pub(crate) fn check_batch(
    provider: Provider,
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<(), AiLlmError> {
    if vectors.len() != expected {
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::CountMismatch {
                expected,
                got: vectors.len(),
            },
        )
        .into());
    }
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::Decode("inconsistent embedding dimensions in batch".into()),
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmProvider;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "nomic-embed-text".into(),
            endpoint: "http://localhost:11434/".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
            query_prefix: Some("search_query: ".into()),
            document_prefix: Some("search_document: ".into()),
        }
    }

    #[test]
    fn intent_prefix_is_applied_per_intent() {
        let c = cfg();
        assert_eq!(
            with_intent_prefix(&c, EmbeddingIntent::Query, "who is Bella?"),
            "search_query: who is Bella?"
        );
        assert_eq!(
            with_intent_prefix(&c, EmbeddingIntent::Document, "Bella runs."),
            "search_document: Bella runs."
        );
        let bare = LlmModelConfig {
            query_prefix: None,
            ..c
        };
        assert!(matches!(
            with_intent_prefix(&bare, EmbeddingIntent::Query, "q"),
            Cow::Borrowed("q")
        ));
    }

    #[test]
    fn endpoint_is_validated_and_trimmed() {
        assert_eq!(
            normalized_endpoint(Provider::Ollama, &cfg()).unwrap(),
            "http://localhost:11434"
        );
        let bad = LlmModelConfig {
            endpoint: "localhost:11434".into(),
            ..cfg()
        };
        assert!(normalized_endpoint(Provider::Ollama, &bad).is_err());
    }

    #[test]
    fn batch_check_rejects_count_and_dimension_mismatch() {
        let ok = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        assert!(check_batch(Provider::Gemini, 2, &ok).is_ok());
        assert!(check_batch(Provider::Gemini, 3, &ok).is_err());
        let ragged = vec![vec![0.1, 0.2], vec![0.3]];
        assert!(check_batch(Provider::Gemini, 2, &ragged).is_err());
    }
}
