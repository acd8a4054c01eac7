//! File-backed index: one JSON line per committed batch.
//!
//! Readers work on an immutable snapshot (`Arc<Snapshot>`); a batch becomes
//! visible only after its line is fully written and synced, by swapping the
//! snapshot. A torn trailing line (crash mid-append) is discarded on open and
//! the file is truncated back to the last complete batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::errors::RagError;
use crate::index::{VectorIndex, batch_dim, check_k, cosine_similarity, fresh_records};
use crate::record::{RagHit, VectorRecord};

#[derive(Debug, Default)]
struct Snapshot {
    records: Vec<VectorRecord>,
    ids: HashSet<String>,
    dim: Option<usize>,
    /// Bytes of the log that belong to committed batches.
    file_len: u64,
}

#[derive(Serialize)]
struct BatchLineRef<'a> {
    records: &'a [VectorRecord],
}

#[derive(Deserialize)]
struct BatchLine {
    records: Vec<VectorRecord>,
}

/// Exact-search index persisted as JSON lines (or kept in memory only).
#[derive(Debug)]
pub struct JsonlIndex {
    path: Option<PathBuf>,
    snapshot: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl JsonlIndex {
    /// Index without persistence.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(()),
        }
    }

    /// Opens (or lazily creates) the log at `path` and loads committed batches.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RagError> {
        let path = path.into();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(index_io(&path, e)),
        };

        let (batches, good_len) = parse_log(&bytes)?;
        if (good_len as usize) < bytes.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - good_len as usize,
                "discarding incomplete trailing batch"
            );
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .open(&path)
                .await
                .map_err(|e| index_io(&path, e))?;
            file.set_len(good_len).await.map_err(|e| index_io(&path, e))?;
        }

        let mut snap = Snapshot {
            file_len: good_len,
            ..Snapshot::default()
        };
        for batch in batches {
            snap.dim = batch_dim(&batch.records, snap.dim)?;
            for r in batch.records {
                if snap.ids.insert(r.id.clone()) {
                    snap.records.push(r);
                }
            }
        }
        info!(path = %path.display(), records = snap.records.len(), "jsonl index loaded");

        Ok(Self {
            path: Some(path),
            snapshot: RwLock::new(Arc::new(snap)),
            writer: Mutex::new(()),
        })
    }

    async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, RagError> {
        let _writer = self.writer.lock().await;
        let current = self.current().await;

        let fresh = fresh_records(records, |id| current.ids.contains(id));
        if fresh.is_empty() {
            debug!("batch already stored");
            return Ok(0);
        }
        let dim = batch_dim(&fresh, current.dim)?;

        let file_len = match &self.path {
            Some(path) => {
                let mut line = serde_json::to_vec(&BatchLineRef { records: &fresh })?;
                line.push(b'\n');
                append_line(path, current.file_len, &line).await?
            }
            None => current.file_len,
        };

        let mut records = Vec::with_capacity(current.records.len() + fresh.len());
        records.extend(current.records.iter().cloned());
        let mut ids = current.ids.clone();
        ids.extend(fresh.iter().map(|r| r.id.clone()));
        let added = fresh.len();
        records.extend(fresh);

        *self.snapshot.write().await = Arc::new(Snapshot {
            records,
            ids,
            dim,
            file_len,
        });
        debug!(added, "batch committed");
        Ok(added)
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<RagHit>, RagError> {
        check_k(k)?;
        let snap = self.current().await;
        if snap.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(want) = snap.dim {
            if vector.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want,
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = snap
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(vector, &r.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RagHit {
                id: snap.records[i].id.clone(),
                text: snap.records[i].text.clone(),
                score,
            })
            .collect())
    }

    async fn clear(&self) -> Result<(), RagError> {
        let _writer = self.writer.lock().await;
        if let Some(path) = &self.path {
            match tokio::fs::File::create(path).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(index_io(path, e)),
            }
        }
        *self.snapshot.write().await = Arc::new(Snapshot::default());
        info!("jsonl index reset");
        Ok(())
    }
}

impl VectorIndex for JsonlIndex {
    fn upsert_batch<'a>(&'a self, records: Vec<VectorRecord>) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(self.upsert(records))
    }

    fn query<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<RagHit>, RagError>> {
        Box::pin(self.search(vector, k))
    }

    fn reset<'a>(&'a self) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.clear())
    }

    fn len<'a>(&'a self) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(async move { Ok(self.current().await.records.len()) })
    }
}

/// Complete (`\n`-terminated) batches and the byte length they span.
fn parse_log(bytes: &[u8]) -> Result<(Vec<BatchLine>, u64), RagError> {
    let mut batches = Vec::new();
    let mut pos = 0usize;
    let mut line_no = 0usize;
    while let Some(nl) = bytes[pos..].iter().position(|b| *b == b'\n') {
        line_no += 1;
        let line = &bytes[pos..pos + nl];
        pos += nl + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let batch: BatchLine = serde_json::from_slice(line).map_err(|e| {
            RagError::IndexFailure(format!("corrupt batch on line {line_no}: {e}"))
        })?;
        batches.push(batch);
    }
    Ok((batches, pos as u64))
}

/// Appends one line and syncs it; on failure the file is cut back to `committed_len`.
async fn append_line(path: &Path, committed_len: u64, line: &[u8]) -> Result<u64, RagError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| index_io(path, e))?;
        }
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| index_io(path, e))?;

    let written = async {
        file.write_all(line).await?;
        file.sync_data().await
    }
    .await;
    if let Err(e) = written {
        if let Err(trunc) = file.set_len(committed_len).await {
            warn!(path = %path.display(), error = %trunc, "rollback of partial batch failed");
        }
        return Err(index_io(path, e));
    }
    Ok(committed_len + line.len() as u64)
}

fn index_io(path: &Path, e: std::io::Error) -> RagError {
    RagError::IndexFailure(format!("{}: {e}", path.display()))
}
