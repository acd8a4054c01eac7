use std::sync::Arc;
use std::time::Duration;

use ai_llm_service::{LlmServiceProfiles, telemetry};
use api::ServerConfig;
use contextor::{Contextor, ContextorConfig};
use rag_store::{LlmEmbedder, RagConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; a present but unreadable file is an error.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    telemetry::init("info")?;

    let svc = Arc::new(LlmServiceProfiles::from_env()?);
    let rag_cfg = RagConfig::from_env()?;
    let index = rag_cfg.open_index().await?;
    info!(records = index.len().await?, "index opened");

    let ctx_cfg = ContextorConfig::from_env()?;
    let (generation, embedding) = svc.profiles();
    for profile in [generation, embedding] {
        if let Some(secs) = profile.timeout_secs {
            if !ctx_cfg.outlasts(Duration::from_secs(secs)) {
                warn!(
                    model = %profile.model,
                    request_timeout_secs = secs,
                    stage_timeout = ?ctx_cfg.stage_timeout,
                    "STAGE_TIMEOUT_SECS is not longer than the provider request timeout; it will cut requests short"
                );
            }
        }
    }

    let embedder = Arc::new(LlmEmbedder::new(svc.clone(), rag_cfg.embedding_dim));
    let contextor = Contextor::new(embedder, index, svc, ctx_cfg)?;

    api::start(Arc::new(contextor), ServerConfig::from_env()?).await?;
    Ok(())
}
