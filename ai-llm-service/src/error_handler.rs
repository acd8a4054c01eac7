//! Unified error handling for `ai-llm-service`.
//!
//! This module exposes a single top-level error type [`AiLlmError`] for the whole
//! library, and groups domain-specific errors in nested types ([`ConfigError`],
//! [`ProviderError`]). Small helpers for reading environment variables are
//! provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[AI LLM Service]` to simplify attribution in logs.

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Provider answered, but not with something usable.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout.
    #[error("[AI LLM Service] operation timed out after {0:?}")]
    Timeout(Duration),

    /// A transient failure persisted through every retry attempt.
    #[error("[AI LLM Service] {op} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        op: &'static str,
        attempts: usize,
        #[source]
        source: Box<AiLlmError>,
    },
}

impl AiLlmError {
    /// Whether a retry has a realistic chance to succeed.
    ///
    /// Rate limiting (429), upstream 5xx, timeouts and connection failures are
    /// transient. Bad configuration, 4xx and undecodable payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            AiLlmError::HttpTransport(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            AiLlmError::Timeout(_) => true,
            AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::HttpStatus(http),
                ..
            }) => http.status == StatusCode::TOO_MANY_REQUESTS || http.status.is_server_error(),
            _ => false,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Provider that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Ollama => f.write_str("Ollama"),
            Provider::Gemini => f.write_str("Gemini"),
        }
    }
}

/// Non-successful HTTP exchange with a provider.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    /// Request URL. Never carries credentials: keys travel in headers.
    pub url: String,
    /// Short snippet of the response body (see [`make_snippet`]).
    pub snippet: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/// What went wrong with a provider call.
#[non_exhaustive]
#[derive(Debug)]
pub enum ProviderErrorKind {
    /// The config targets another provider than the client.
    InvalidProvider,
    /// Provider requires an API key and none was configured.
    MissingApiKey,
    /// Endpoint is empty or does not start with http/https.
    InvalidEndpoint(String),
    /// Upstream returned a non-successful HTTP status.
    HttpStatus(HttpError),
    /// Response payload could not be decoded as expected.
    Decode(String),
    /// Generation returned no candidate text.
    EmptyChoices,
    /// Batch embedding returned a different number of vectors than inputs.
    CountMismatch { expected: usize, got: usize },
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::InvalidProvider => f.write_str("invalid provider for this client"),
            ProviderErrorKind::MissingApiKey => f.write_str("missing API key"),
            ProviderErrorKind::InvalidEndpoint(e) => write!(f, "invalid endpoint: {e}"),
            ProviderErrorKind::HttpStatus(h) => write!(f, "{h}"),
            ProviderErrorKind::Decode(m) => write!(f, "decode error: {m}"),
            ProviderErrorKind::EmptyChoices => f.write_str("response contained no text"),
            ProviderErrorKind::CountMismatch { expected, got } => {
                write!(f, "expected {expected} embeddings, got {got}")
            }
        }
    }
}

/// Provider-attributed error.
#[derive(Debug, Error)]
#[error("[AI LLM Service] {provider}: {kind}")]
pub struct ProviderError {
    pub provider: Provider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/// Clamps a response body to a short single-line snippet for logs and errors.
pub fn make_snippet(body: &str) -> String {
    body.chars()
        .take(240)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`AiLlmError::Config`] with [`ConfigError::MissingVar`] if the
/// variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Optional, non-empty environment variable.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse::<u32>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            })
        }),
        _ => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse::<u64>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        _ => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_err(status: StatusCode) -> AiLlmError {
        ProviderError::new(
            Provider::Gemini,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: "https://example.test/v1beta/models/m:embedContent".into(),
                snippet: String::new(),
            }),
        )
        .into()
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(status_err(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(status_err(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(AiLlmError::Timeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!status_err(StatusCode::BAD_REQUEST).is_transient());
        assert!(!status_err(StatusCode::UNAUTHORIZED).is_transient());
        let decode: AiLlmError =
            ProviderError::new(Provider::Ollama, ProviderErrorKind::EmptyChoices).into();
        assert!(!decode.is_transient());
        assert!(!AiLlmError::from(ConfigError::MissingVar("X")).is_transient());
    }

    #[test]
    fn snippet_is_clamped_and_single_line() {
        let body = format!("line one\nline two {}", "x".repeat(500));
        let s = make_snippet(&body);
        assert!(s.chars().count() <= 240);
        assert!(!s.contains('\n'));
    }
}
