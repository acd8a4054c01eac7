use std::fmt;
use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for generation and embeddings.
///
/// Adding more providers can be done by extending this enum and wiring a
/// client in [`crate::services`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime for on-device inference.
    Ollama,
    /// Google Generative Language API (Gemini models).
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    /// Parses the `LLM_KIND` value (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Gemini => "gemini",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert_eq!(" Gemini ".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert!("chatgpt".parse::<LlmProvider>().is_err());
    }
}
