//! Provider clients for text generation and embeddings.
//!
//! - [`service_profiles::LlmServiceProfiles`] is the entry point used by the
//!   rest of the workspace: one generation profile, one embedding profile.
//! - Providers live in [`services`] (Ollama, Gemini).
//! - Every outbound call goes through [`retry::with_retry`].

pub mod config;
pub mod embedding_intent;
pub mod error_handler;
pub mod retry;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use embedding_intent::EmbeddingIntent;
pub use error_handler::{AiLlmError, ConfigError};
pub use retry::RetryPolicy;
pub use service_profiles::LlmServiceProfiles;
