//! Ingestion and retrieval storage for the plot corpus.
//!
//! - [`chunker`] splits the source into overlapping windows
//! - [`EmbeddingsProvider`] turns text into vectors (explicit intent)
//! - [`VectorIndex`] stores records and answers cosine top-k queries,
//!   backed by a JSON-lines log or Qdrant
//! - [`IngestionPipeline`] drives the three, batch by batch

pub mod chunker;
mod config;
mod embed;
mod errors;
pub mod index;
mod ingest;
pub mod progress;
mod record;

pub use ai_llm_service::EmbeddingIntent;
pub use chunker::{ChunkParams, chunk};
pub use config::{IndexBackend, RagConfig};
pub use embed::{EmbeddingsProvider, LlmEmbedder};
pub use errors::RagError;
pub use index::jsonl::JsonlIndex;
pub use index::qdrant::{QdrantIndex, QdrantSettings};
pub use index::{VectorIndex, cosine_similarity};
pub use ingest::{IngestReport, IngestionPipeline};
pub use progress::{IndicatifProgress, IngestProgress, NoopProgress};
pub use record::{Chunk, RagHit, VectorRecord};

/// Boxed future returned by the capability traits.
pub use futures::future::BoxFuture;
