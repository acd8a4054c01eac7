//! Ingestion pipeline: chunk → embed (document intent) → upsert, batch by batch.
//!
//! Batches run strictly in order. The first embedding or index failure stops
//! the run; batches committed before it stay in the index, and since record
//! ids are deterministic a re-run does not duplicate them. Ids include the
//! chunk text, so an edited source adds its new passages; records of the old
//! revision stay until the index is rebuilt and are reported as `stale`.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::EmbeddingIntent;
use tracing::{debug, error, info, warn};

use crate::chunker::{ChunkParams, chunk};
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::progress::IngestProgress;
use crate::record::{Chunk, VectorRecord};

/// Summary of one ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub batches: usize,
    /// Records newly added to the index.
    pub stored: usize,
    /// Records already present (same id) and left untouched.
    pub skipped: usize,
    /// Records that were in the index before the run and that this run did
    /// not produce: other sources or an older revision of this one.
    pub stale: usize,
}

/// Drives Chunker → Embedding provider → Vector index.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn VectorIndex>,
    params: ChunkParams,
    batch_size: usize,
}

impl IngestionPipeline {
    /// Fails with `InvalidParameter` before any work if the chunking or batch
    /// parameters are unusable.
    pub fn new(
        embedder: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn VectorIndex>,
        params: ChunkParams,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let params = ChunkParams::new(params.chunk_size, params.overlap)?;
        if batch_size == 0 {
            return Err(RagError::InvalidParameter("batch_size must be > 0".into()));
        }
        Ok(Self {
            embedder,
            index,
            params,
            batch_size,
        })
    }

    /// Ingests `text`, naming its records after `source`.
    pub async fn run(
        &self,
        source: &str,
        text: &str,
        progress: &dyn IngestProgress,
    ) -> Result<IngestReport, RagError> {
        let started = Instant::now();
        let chunks = chunk(source, text, self.params)?;
        let total = chunks.len();
        let total_batches = total.div_ceil(self.batch_size);
        info!(
            source,
            chunks = total,
            batches = total_batches,
            chunk_size = self.params.chunk_size,
            overlap = self.params.overlap,
            "ingestion started"
        );
        progress.start(total, total_batches);
        let before = self.index.len().await?;

        let mut report = IngestReport {
            chunks: total,
            ..IngestReport::default()
        };
        let mut processed = 0usize;

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let records = self.embed_batch(batch).await.inspect_err(|e| {
                error!(batch = batch_no, error = %e, "embedding failed, stopping ingestion");
            })?;

            let added = self.index.upsert_batch(records).await.inspect_err(|e| {
                error!(batch = batch_no, error = %e, "index write failed, stopping ingestion");
            })?;

            processed += batch.len();
            report.batches += 1;
            report.stored += added;
            report.skipped += batch.len() - added.min(batch.len());
            info!(batch = batch_no, processed, total, "{processed} / {total}");
            progress.batch_committed(processed, total);
        }

        report.stale = before.saturating_sub(report.skipped);
        if report.stale > 0 {
            warn!(
                stale = report.stale,
                "index holds records this run did not produce; rebuild to drop them"
            );
        }

        info!(
            stored = report.stored,
            skipped = report.skipped,
            latency_ms = started.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        progress.finish(&report);
        Ok(report)
    }

    /// Embeds one batch and attaches the vectors; any mismatch fails the whole batch.
    async fn embed_batch(&self, batch: &[Chunk]) -> Result<Vec<VectorRecord>, RagError> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts, EmbeddingIntent::Document)
            .await
            .map_err(|e| match e {
                RagError::EmbeddingFailure(_) => e,
                other => RagError::EmbeddingFailure(other.to_string()),
            })?;
        if vectors.len() != batch.len() {
            return Err(RagError::EmbeddingFailure(format!(
                "expected {} vectors, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        debug!(batch = batch.len(), "batch embedded");

        batch
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(mut c, v)| {
                c.embedding = Some(v);
                c.into_record()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::index::jsonl::JsonlIndex;
    use crate::progress::NoopProgress;
    use crate::record::RagHit;

    /// One-hot embedding per distinct letter, so "DEFG" is closest to a D/E/F/G query.
    struct LetterEmbedder {
        calls: AtomicUsize,
        intents: Mutex<Vec<EmbeddingIntent>>,
        fail_on_call: Option<usize>,
    }

    impl LetterEmbedder {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                intents: Mutex::new(Vec::new()),
                fail_on_call,
            }
        }
    }

    fn letters(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; 26];
        for c in text.chars().filter(|c| c.is_ascii_uppercase()) {
            v[(c as u8 - b'A') as usize] += 1.0;
        }
        v
    }

    impl EmbeddingsProvider for LetterEmbedder {
        fn embed<'a>(&'a self, text: &'a str, intent: EmbeddingIntent) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.intents.lock().unwrap().push(intent);
                Ok(letters(text))
            })
        }

        fn embed_batch<'a>(
            &'a self,
            texts: &'a [String],
            intent: EmbeddingIntent,
        ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                self.intents.lock().unwrap().push(intent);
                if Some(n) == self.fail_on_call {
                    return Err(RagError::EmbeddingFailure("provider unavailable".into()));
                }
                Ok(texts.iter().map(|t| letters(t)).collect())
            })
        }
    }

    /// Index that fails the n-th write without storing anything from it.
    struct FlakyIndex {
        inner: JsonlIndex,
        writes: AtomicUsize,
        fail_on_write: usize,
    }

    impl VectorIndex for FlakyIndex {
        fn upsert_batch<'a>(&'a self, records: Vec<VectorRecord>) -> BoxFuture<'a, Result<usize, RagError>> {
            Box::pin(async move {
                if self.writes.fetch_add(1, Ordering::SeqCst) == self.fail_on_write {
                    return Err(RagError::IndexFailure("disk full".into()));
                }
                self.inner.upsert_batch(records).await
            })
        }
        fn query<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<RagHit>, RagError>> {
            self.inner.query(vector, k)
        }
        fn reset<'a>(&'a self) -> BoxFuture<'a, Result<(), RagError>> {
            self.inner.reset()
        }
        fn len<'a>(&'a self) -> BoxFuture<'a, Result<usize, RagError>> {
            self.inner.len()
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(usize, usize)>>);
    impl IngestProgress for Recorder {
        fn batch_committed(&self, processed: usize, total: usize) {
            self.0.lock().unwrap().push((processed, total));
        }
    }

    fn params(c: usize, o: usize) -> ChunkParams {
        ChunkParams::new(c, o).unwrap()
    }

    #[tokio::test]
    async fn ingests_and_retrieves_the_middle_chunk() {
        let embedder = Arc::new(LetterEmbedder::new(None));
        let index = Arc::new(JsonlIndex::in_memory());
        let pipeline = IngestionPipeline::new(embedder.clone(), index.clone(), params(4, 1), 2).unwrap();

        let progress = Recorder::default();
        let report = pipeline.run("plot.txt", "ABCDEFGHIJ", &progress).await.unwrap();
        assert_eq!(
            report,
            IngestReport {
                chunks: 3,
                batches: 2,
                stored: 3,
                skipped: 0,
                stale: 0,
            }
        );
        assert_eq!(*progress.0.lock().unwrap(), [(2, 3), (3, 3)]);
        assert!(
            embedder
                .intents
                .lock()
                .unwrap()
                .iter()
                .all(|i| *i == EmbeddingIntent::Document)
        );

        let hits = index.query(&letters("EF"), 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "DEFG");
    }

    #[tokio::test]
    async fn rerun_does_not_duplicate() {
        let embedder = Arc::new(LetterEmbedder::new(None));
        let index = Arc::new(JsonlIndex::in_memory());
        let pipeline = IngestionPipeline::new(embedder, index.clone(), params(4, 1), 100).unwrap();

        pipeline.run("plot.txt", "ABCDEFGHIJ", &NoopProgress).await.unwrap();
        let again = pipeline.run("plot.txt", "ABCDEFGHIJ", &NoopProgress).await.unwrap();
        assert_eq!(again.stored, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(again.stale, 0);
        assert_eq!(index.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn edited_source_reaches_the_index() {
        let embedder = Arc::new(LetterEmbedder::new(None));
        let index = Arc::new(JsonlIndex::in_memory());
        let pipeline = IngestionPipeline::new(embedder, index.clone(), params(4, 1), 100).unwrap();

        pipeline.run("plot.txt", "ABCDEFGHIJ", &NoopProgress).await.unwrap();
        let edited = pipeline.run("plot.txt", "ABCDXYZGHIJ", &NoopProgress).await.unwrap();
        // ABCD is unchanged; DXYZ, ZGHI and IJ are new
        assert_eq!(edited.chunks, 4);
        assert_eq!(edited.skipped, 1);
        assert_eq!(edited.stored, 3);
        // DEFG and GHIJ belong to the old revision
        assert_eq!(edited.stale, 2);

        let hits = index.query(&letters("XYZ"), 1).await.unwrap();
        assert_eq!(hits[0].text, "DXYZ");
    }

    #[tokio::test]
    async fn embedding_failure_stops_after_committed_batches() {
        let embedder = Arc::new(LetterEmbedder::new(Some(1)));
        let index = Arc::new(JsonlIndex::in_memory());
        let pipeline = IngestionPipeline::new(embedder.clone(), index.clone(), params(2, 0), 2).unwrap();

        let progress = Recorder::default();
        let err = pipeline.run("plot.txt", "ABCDEFGHIJ", &progress).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure(_)));
        // batch 0 committed, batch 1 failed, batch 2 never attempted
        assert_eq!(index.len().await.unwrap(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*progress.0.lock().unwrap(), [(2, 5)]);
    }

    #[tokio::test]
    async fn index_failure_leaves_no_partial_batch() {
        let index = Arc::new(FlakyIndex {
            inner: JsonlIndex::in_memory(),
            writes: AtomicUsize::new(0),
            fail_on_write: 1,
        });
        let pipeline =
            IngestionPipeline::new(Arc::new(LetterEmbedder::new(None)), index.clone(), params(2, 0), 3).unwrap();

        let err = pipeline.run("plot.txt", "ABCDEFGHIJ", &NoopProgress).await.unwrap_err();
        assert!(matches!(err, RagError::IndexFailure(_)));
        assert_eq!(index.len().await.unwrap(), 3);
        let texts: Vec<_> = index
            .query(&letters("ABCDEFGHIJ"), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.text)
            .collect();
        assert!(texts.iter().all(|t| ["AB", "CD", "EF"].contains(&t.as_str())));
    }

    #[tokio::test]
    async fn empty_text_is_a_no_op() {
        let embedder = Arc::new(LetterEmbedder::new(None));
        let pipeline =
            IngestionPipeline::new(embedder.clone(), Arc::new(JsonlIndex::in_memory()), params(500, 100), 100).unwrap();
        let report = pipeline.run("plot.txt", "", &NoopProgress).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_invalid_parameters_up_front() {
        let mk = |p: ChunkParams, b: usize| {
            IngestionPipeline::new(
                Arc::new(LetterEmbedder::new(None)),
                Arc::new(JsonlIndex::in_memory()),
                p,
                b,
            )
        };
        assert!(matches!(mk(params(4, 1), 0), Err(RagError::InvalidParameter(_))));
        let bad = ChunkParams {
            chunk_size: 4,
            overlap: 4,
        };
        assert!(matches!(mk(bad, 10), Err(RagError::InvalidParameter(_))));
    }
}
