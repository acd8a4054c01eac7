//! Thin adapter around `qdrant-client` implementing [`VectorIndex`].
//!
//! The collection (cosine distance) is created on the first upsert. Each
//! batch is sent as a single `upsert_points` request with `wait=true`.
//! Ids already in the collection are skipped, so a re-run neither counts nor
//! renumbers them. Points carry their text and an insertion sequence number
//! (`seq`) in the payload; hits are re-sorted by `(score desc, seq asc)` so ties come back
//! in insertion order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    ScrollPointsBuilder, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QValue, VectorParamsBuilder,
};
use qdrant_client::Payload;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::RagError;
use crate::index::{VectorIndex, batch_dim, check_k, fresh_records, rank};
use crate::record::{RagHit, VectorRecord};

const TEXT_FIELD: &str = "text";
const SEQ_FIELD: &str = "seq";
const SCROLL_PAGE: u32 = 256;

/// Connection settings for [`QdrantIndex`].
#[derive(Clone)]
pub struct QdrantSettings {
    /// gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Vector size the collection must have; taken from the first batch when `None`.
    pub dim: Option<usize>,
}

impl fmt::Debug for QdrantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantSettings")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("collection", &self.collection)
            .field("dim", &self.dim)
            .finish()
    }
}

/// Qdrant-backed vector index.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dim: Option<usize>,
    collection_ready: AtomicBool,
    /// Next insertion sequence number; `None` until read from the collection.
    /// Held for the whole upsert, so batches are written one at a time.
    next_seq: Mutex<Option<u64>>,
}

impl QdrantIndex {
    pub fn new(settings: &QdrantSettings) -> Result<Self, RagError> {
        if settings.url.trim().is_empty() {
            return Err(RagError::Config("qdrant url is empty".into()));
        }
        if settings.collection.trim().is_empty() {
            return Err(RagError::Config("qdrant collection is empty".into()));
        }

        let mut builder = Qdrant::from_url(&settings.url);
        if let Some(key) = &settings.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Config(format!("qdrant client: {e}")))?;

        info!(url = %settings.url, collection = %settings.collection, "qdrant index configured");
        Ok(Self {
            client,
            collection: settings.collection.clone(),
            dim: settings.dim,
            collection_ready: AtomicBool::new(false),
            next_seq: Mutex::new(None),
        })
    }

    async fn exists(&self) -> Result<bool, RagError> {
        if self.collection_ready.load(Ordering::Acquire) {
            return Ok(true);
        }
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(qdrant_err)?;
        if exists {
            self.collection_ready.store(true, Ordering::Release);
        }
        Ok(exists)
    }

    async fn ensure_collection(&self, dim: usize) -> Result<(), RagError> {
        if self.exists().await? {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .map_err(qdrant_err)?;
        self.collection_ready.store(true, Ordering::Release);
        info!(collection = %self.collection, dim, "collection created");
        Ok(())
    }

    async fn count(&self) -> Result<u64, RagError> {
        if !self.exists().await? {
            return Ok(0);
        }
        let res = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(qdrant_err)?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }

    /// Ids of `records` that are already stored.
    async fn existing_ids(&self, records: &[VectorRecord]) -> Result<HashSet<String>, RagError> {
        if records.is_empty() || !self.exists().await? {
            return Ok(HashSet::new());
        }
        let ids: Vec<PointId> = records.iter().map(|r| PointId::from(r.id.clone())).collect();
        let res = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, ids)
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await
            .map_err(qdrant_err)?;
        Ok(res.result.into_iter().map(|p| point_id_string(p.id)).collect())
    }

    /// Stores the records whose id is not in the collection yet. Stored
    /// points are never rewritten, so they keep their `seq`.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, RagError> {
        let mut next_seq = self.next_seq.lock().await;

        let Some(dim) = batch_dim(&records, self.dim)? else {
            return Ok(0);
        };
        let known = self.existing_ids(&records).await?;
        let records = fresh_records(records, |id| known.contains(id));
        if records.is_empty() {
            debug!(collection = %self.collection, "batch already stored");
            return Ok(0);
        }

        self.ensure_collection(dim).await?;
        let start = match *next_seq {
            Some(s) => s,
            None => self.count().await?,
        };

        let n = records.len();
        let points: Vec<PointStruct> = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| to_point(r, start + i as u64))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(qdrant_err)?;

        *next_seq = Some(start + n as u64);
        debug!(collection = %self.collection, points = n, skipped = known.len(), "batch upserted");
        Ok(n)
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<RagHit>, RagError> {
        check_k(k)?;
        if !self.exists().await? {
            return Ok(Vec::new());
        }
        if let Some(want) = self.dim {
            if vector.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want,
                });
            }
        }
        if vector.iter().all(|x| *x == 0.0) {
            // every similarity is 0: insertion order alone decides
            return self.earliest(k).await;
        }

        // extra candidates so ties at the cut-off can be re-ordered by seq
        let limit = k.saturating_mul(2) as u64;
        let res = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit)
                    .with_payload(true)
                    .params(SearchParamsBuilder::default().exact(true)),
            )
            .await
            .map_err(qdrant_err)?;

        let scored = res
            .result
            .into_iter()
            .map(|p| to_hit(p.id, &p.payload, p.score))
            .collect();
        Ok(rank(scored, k))
    }

    async fn earliest(&self, k: usize) -> Result<Vec<RagHit>, RagError> {
        let mut all = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut req = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(o) = offset.take() {
                req = req.offset(o);
            }
            let page = self.client.scroll(req).await.map_err(qdrant_err)?;
            all.extend(page.result.into_iter().map(|p| to_hit(p.id, &p.payload, 0.0)));
            match page.next_page_offset {
                Some(o) => offset = Some(o),
                None => break,
            }
        }
        Ok(rank(all, k))
    }

    async fn drop_collection(&self) -> Result<(), RagError> {
        let mut next_seq = self.next_seq.lock().await;
        if self.exists().await? {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(qdrant_err)?;
            info!(collection = %self.collection, "collection deleted");
        }
        self.collection_ready.store(false, Ordering::Release);
        *next_seq = Some(0);
        Ok(())
    }
}

impl VectorIndex for QdrantIndex {
    fn upsert_batch<'a>(&'a self, records: Vec<VectorRecord>) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(self.upsert(records))
    }

    fn query<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<RagHit>, RagError>> {
        Box::pin(self.search(vector, k))
    }

    fn reset<'a>(&'a self) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.drop_collection())
    }

    fn len<'a>(&'a self) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(async move { Ok(self.count().await? as usize) })
    }
}

fn to_point(r: VectorRecord, seq: u64) -> PointStruct {
    let mut payload = Payload::new();
    payload.insert(TEXT_FIELD, r.text);
    payload.insert(SEQ_FIELD, seq as i64);
    PointStruct::new(r.id, r.embedding, payload)
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn to_hit(id: Option<PointId>, payload: &HashMap<String, QValue>, score: f32) -> (u64, RagHit) {
    let id = point_id_string(id);
    let text = match payload.get(TEXT_FIELD).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    };
    let seq = match payload.get(SEQ_FIELD).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => u64::try_from(*i).unwrap_or(u64::MAX),
        Some(Kind::DoubleValue(d)) => *d as u64,
        _ => u64::MAX,
    };
    (seq, RagHit { id, text, score })
}

fn qdrant_err(e: qdrant_client::QdrantError) -> RagError {
    RagError::IndexFailure(format!("qdrant: {e}"))
}
