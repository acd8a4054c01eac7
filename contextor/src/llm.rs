//! Generation capability used by the orchestrator.

use ai_llm_service::LlmServiceProfiles;
use rag_store::BoxFuture;

use crate::error::{ContextorError, Stage};

/// Turns a complete prompt into answer text.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ContextorError>>;
}

impl Generator for LlmServiceProfiles {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ContextorError>> {
        Box::pin(async move {
            LlmServiceProfiles::generate(self, prompt)
                .await
                .map_err(|e| ContextorError::upstream(Stage::Generated, e))
        })
    }
}
