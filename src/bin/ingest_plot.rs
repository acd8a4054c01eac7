//! Offline ingestion: `ingest-plot [PATH]`.
//!
//! Reads the plot text (`PATH` or `PLOT_FILE_PATH`, default `./plot.txt`),
//! chunks and embeds it, and stores the vectors in the configured index.
//! `INGEST_REBUILD=true` empties the index first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_llm_service::{LlmServiceProfiles, telemetry};
use anyhow::Context;
use rag_store::{IndicatifProgress, IngestionPipeline, LlmEmbedder, RagConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    telemetry::init("info")?;

    let path: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PLOT_FILE_PATH").ok())
        .unwrap_or_else(|| "./plot.txt".into())
        .into();
    let rebuild = match std::env::var("INGEST_REBUILD") {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<bool>()
            .with_context(|| format!("INGEST_REBUILD={v:?} is not true/false"))?,
        _ => false,
    };

    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let rag_cfg = RagConfig::from_env()?;
    let svc = Arc::new(LlmServiceProfiles::from_env()?);
    let embedder = Arc::new(LlmEmbedder::new(svc, rag_cfg.embedding_dim));
    let index = rag_cfg.open_index().await?;

    if rebuild {
        warn!("INGEST_REBUILD set, dropping existing records");
        index.reset().await?;
    }

    let pipeline = IngestionPipeline::new(embedder, index.clone(), rag_cfg.chunk, rag_cfg.batch_size)?;
    let progress = IndicatifProgress::new();
    let report = pipeline
        .run(&source_name(&path), &text, &progress)
        .await
        .context("ingestion stopped; batches before the failure are stored")?;

    info!(
        chunks = report.chunks,
        batches = report.batches,
        stored = report.stored,
        skipped = report.skipped,
        stale = report.stale,
        total = index.len().await?,
        "ingestion complete"
    );
    Ok(())
}

/// Record ids are derived from this name, so it must not depend on the working directory.
fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
