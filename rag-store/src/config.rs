//! Runtime configuration for indexing and ingestion, read from environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::chunker::ChunkParams;
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::index::jsonl::JsonlIndex;
use crate::index::qdrant::{QdrantIndex, QdrantSettings};

const DEFAULT_INDEX_PATH: &str = "./data/plot_vectors.jsonl";
const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6334";
const DEFAULT_COLLECTION: &str = "plot_vectors";

/// Where vectors are stored.
#[derive(Clone, Debug)]
pub enum IndexBackend {
    Jsonl { path: PathBuf },
    Qdrant(QdrantSettings),
}

/// Configuration for RAG ingestion and retrieval storage.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub backend: IndexBackend,
    /// Expected embedding dimension, when known up front.
    pub embedding_dim: Option<usize>,
    pub chunk: ChunkParams,
    /// Chunks per embed + upsert round.
    pub batch_size: usize,
}

impl RagConfig {
    /// Reads:
    /// - `INDEX_BACKEND` (`jsonl` | `qdrant`, default `jsonl`), `INDEX_PATH`
    /// - `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION` (default `plot_vectors`)
    /// - `EMBEDDING_DIM`
    /// - `CHUNK_SIZE` (500), `CHUNK_OVERLAP` (100), `INGEST_BATCH_SIZE` (100)
    pub fn from_env() -> Result<Self, RagError> {
        let embedding_dim = parse_opt::<usize>("EMBEDDING_DIM")?;

        let backend = match env("INDEX_BACKEND", "jsonl").to_ascii_lowercase().as_str() {
            "jsonl" | "file" => IndexBackend::Jsonl {
                path: PathBuf::from(env("INDEX_PATH", DEFAULT_INDEX_PATH)),
            },
            "qdrant" => IndexBackend::Qdrant(QdrantSettings {
                url: env("QDRANT_URL", DEFAULT_QDRANT_URL),
                api_key: env_opt("QDRANT_API_KEY"),
                collection: env("QDRANT_COLLECTION", DEFAULT_COLLECTION),
                dim: embedding_dim,
            }),
            other => {
                return Err(RagError::Config(format!(
                    "INDEX_BACKEND must be `jsonl` or `qdrant`, got `{other}`"
                )));
            }
        };

        let chunk = ChunkParams::new(
            parse("CHUNK_SIZE", 500usize)?,
            parse("CHUNK_OVERLAP", 100usize)?,
        )?;
        let batch_size = parse("INGEST_BATCH_SIZE", 100usize)?;
        if batch_size == 0 {
            return Err(RagError::InvalidParameter("INGEST_BATCH_SIZE must be > 0".into()));
        }

        Ok(Self {
            backend,
            embedding_dim,
            chunk,
            batch_size,
        })
    }

    /// Opens the configured index backend.
    pub async fn open_index(&self) -> Result<Arc<dyn VectorIndex>, RagError> {
        match &self.backend {
            IndexBackend::Jsonl { path } => {
                info!(path = %path.display(), "using jsonl index");
                Ok(Arc::new(JsonlIndex::open(path.clone()).await?))
            }
            IndexBackend::Qdrant(settings) => {
                info!(collection = %settings.collection, "using qdrant index");
                Ok(Arc::new(QdrantIndex::new(settings)?))
            }
        }
    }
}

pub(crate) fn env(k: &str, dflt: &str) -> String {
    env_opt(k).unwrap_or_else(|| dflt.to_string())
}

pub(crate) fn env_opt(k: &str) -> Option<String> {
    std::env::var(k)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `k` if set; a present but malformed value is an error, not a fallback.
pub(crate) fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, RagError>
where
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(k)?.unwrap_or(dflt))
}

pub(crate) fn parse_opt<T: FromStr>(k: &str) -> Result<Option<T>, RagError>
where
    T::Err: std::fmt::Display,
{
    match env_opt(k) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e| RagError::Config(format!("{k}={v:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_use_defaults() {
        assert_eq!(parse("RAG_STORE_TEST_UNSET_VAR", 7usize).unwrap(), 7);
        assert_eq!(parse_opt::<usize>("RAG_STORE_TEST_UNSET_VAR").unwrap(), None);
    }

    #[test]
    fn malformed_number_is_rejected() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("RAG_STORE_TEST_BAD_NUMBER", "five") };
        assert!(matches!(
            parse("RAG_STORE_TEST_BAD_NUMBER", 5usize),
            Err(RagError::Config(_))
        ));
    }
}
