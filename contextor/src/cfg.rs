//! Runtime configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ContextorError;
use crate::prompt::{DEFAULT_NO_INFO_ANSWER, DEFAULT_PREAMBLE};

/// Longer than the slowest default provider request (Ollama generation, 120 s).
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 180;

/// Knobs for answering questions. `Default` mirrors the env defaults.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    /// Records retrieved per question.
    pub top_k: usize,
    /// Placed between retrieved chunks in the prompt.
    pub separator: String,
    /// Upper bound for each stage (embedding, retrieval, generation),
    /// provider retries included. When it is shorter than the provider's own
    /// request timeout it wins and the call ends as `Timeout`.
    pub stage_timeout: Duration,
    pub preamble: String,
    pub no_info_answer: String,
    /// Send the "no information" prompt to the model instead of answering
    /// locally when retrieval is empty.
    pub no_info_via_model: bool,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            separator: "\n\n---\n\n".into(),
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            preamble: DEFAULT_PREAMBLE.into(),
            no_info_answer: DEFAULT_NO_INFO_ANSWER.into(),
            no_info_via_model: false,
        }
    }
}

impl ContextorConfig {
    /// Reads `RAG_TOP_K`, `CONTEXT_SEPARATOR` (`\n` escapes allowed),
    /// `STAGE_TIMEOUT_SECS`, `PROMPT_PREAMBLE`, `NO_INFO_ANSWER`, `NO_INFO_VIA_MODEL`.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            top_k: parse("RAG_TOP_K", d.top_k)?,
            separator: env_opt_raw("CONTEXT_SEPARATOR")
                .map(|s| unescape(&s))
                .unwrap_or(d.separator),
            stage_timeout: Duration::from_secs(parse("STAGE_TIMEOUT_SECS", DEFAULT_STAGE_TIMEOUT_SECS)?),
            preamble: env_opt("PROMPT_PREAMBLE").unwrap_or(d.preamble),
            no_info_answer: env_opt("NO_INFO_ANSWER").unwrap_or(d.no_info_answer),
            no_info_via_model: parse("NO_INFO_VIA_MODEL", d.no_info_via_model)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// `true` when a provider request bounded by `request_timeout` can finish
    /// within one stage.
    pub fn outlasts(&self, request_timeout: Duration) -> bool {
        self.stage_timeout > request_timeout
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.top_k == 0 {
            return Err(ContextorError::Config("RAG_TOP_K must be > 0".into()));
        }
        if self.stage_timeout.is_zero() {
            return Err(ContextorError::Config("STAGE_TIMEOUT_SECS must be > 0".into()));
        }
        Ok(())
    }
}

fn env_opt_raw(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.is_empty())
}

fn env_opt(k: &str) -> Option<String> {
    env_opt_raw(k)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, ContextorError>
where
    T::Err: std::fmt::Display,
{
    match env_opt(k) {
        None => Ok(dflt),
        Some(v) => v
            .parse()
            .map_err(|e| ContextorError::Config(format!("{k}={v:?}: {e}"))),
    }
}

/// `\n`, `\t` and `\\` escapes, so separators can be set from a one-line `.env`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_separator() {
        assert_eq!(unescape(r"\n\n---\n\n"), "\n\n---\n\n");
        assert_eq!(unescape(r"a\\b\x"), r"a\b\x");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let cfg = ContextorConfig {
            top_k: 0,
            ..ContextorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ContextorError::Config(_))));
        assert!(ContextorConfig::default().validate().is_ok());
    }

    #[test]
    fn default_stage_timeout_outlasts_provider_requests() {
        let cfg = ContextorConfig::default();
        assert!(cfg.outlasts(Duration::from_secs(120)));
        let short = ContextorConfig {
            stage_timeout: Duration::from_secs(60),
            ..cfg
        };
        assert!(!short.outlasts(Duration::from_secs(120)));
    }
}
