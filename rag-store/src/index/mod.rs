//! Vector index capability and the cosine ranking shared by backends.

pub mod jsonl;
pub mod qdrant;

use std::collections::HashSet;

use futures::future::BoxFuture;

use crate::errors::RagError;
use crate::record::{RagHit, VectorRecord};

/// Append-only store of embedded chunks with k-nearest-neighbour search.
///
/// `upsert_batch` is all-or-nothing: after it returns, either every record of
/// the batch is visible to `query` or none is. Queries never observe a
/// half-written batch.
pub trait VectorIndex: Send + Sync {
    /// Stores a batch. Returns how many records were newly added; records
    /// whose id is already present are not duplicated.
    fn upsert_batch<'a>(&'a self, records: Vec<VectorRecord>) -> BoxFuture<'a, Result<usize, RagError>>;

    /// Up to `k` records most similar to `vector` by cosine similarity,
    /// best first, ties in insertion order. An empty index yields no hits.
    fn query<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<RagHit>, RagError>>;

    /// Drops every record (full rebuild path).
    fn reset<'a>(&'a self) -> BoxFuture<'a, Result<(), RagError>>;

    /// Number of stored records.
    fn len<'a>(&'a self) -> BoxFuture<'a, Result<usize, RagError>>;
}

/// Cosine similarity; `0.0` when either vector has zero norm.
///
/// Vectors of different length are compared over their common prefix;
/// callers check dimensions beforehand.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let s = dot / (na.sqrt() * nb.sqrt());
    if s.is_finite() { s as f32 } else { 0.0 }
}

pub(crate) fn check_k(k: usize) -> Result<(), RagError> {
    if k == 0 {
        return Err(RagError::InvalidParameter("k must be > 0".into()));
    }
    Ok(())
}

/// Checks that every record carries a non-empty vector of one dimension,
/// matching `want` when the index already has one.
pub(crate) fn batch_dim(records: &[VectorRecord], want: Option<usize>) -> Result<Option<usize>, RagError> {
    let Some(first) = records.first() else {
        return Ok(want);
    };
    let dim = want.unwrap_or(first.embedding.len());
    if dim == 0 {
        return Err(RagError::IndexFailure(format!("record {} has an empty embedding", first.id)));
    }
    for r in records {
        if r.embedding.len() != dim {
            return Err(RagError::VectorSizeMismatch {
                got: r.embedding.len(),
                want: dim,
            });
        }
    }
    Ok(Some(dim))
}

/// Drops records whose id is `known` to the index or repeats earlier in the batch.
pub(crate) fn fresh_records(records: Vec<VectorRecord>, known: impl Fn(&str) -> bool) -> Vec<VectorRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| !known(&r.id) && seen.insert(r.id.clone()))
        .collect()
}

/// Sorts `(seq, hit)` pairs by score descending, then `seq` ascending, and keeps `k`.
pub(crate) fn rank(mut scored: Vec<(u64, RagHit)>, k: usize) -> Vec<RagHit> {
    scored.sort_by(|(sa, a), (sb, b)| b.score.total_cmp(&a.score).then(sa.cmp(sb)));
    scored.truncate(k);
    scored.into_iter().map(|(_, hit)| hit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> RagHit {
        RagHit {
            id: id.into(),
            text: id.into(),
            score,
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // magnitude does not matter
        assert!((cosine_similarity(&[2.0, 2.0], &[0.5, 0.5]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let out = rank(
            vec![(2, hit("c", 0.5)), (0, hit("a", 0.5)), (1, hit("b", 0.9)), (3, hit("d", 0.5))],
            3,
        );
        let ids: Vec<_> = out.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn batch_dim_rejects_mixed_dimensions() {
        let rec = |id: &str, v: Vec<f32>| VectorRecord {
            id: id.into(),
            text: String::new(),
            embedding: v,
        };
        assert_eq!(batch_dim(&[rec("a", vec![1.0, 2.0])], None).unwrap(), Some(2));
        assert!(batch_dim(&[rec("a", vec![1.0, 2.0]), rec("b", vec![1.0])], None).is_err());
        assert!(batch_dim(&[rec("a", vec![1.0, 2.0])], Some(3)).is_err());
        assert!(batch_dim(&[rec("a", vec![])], None).is_err());
        assert_eq!(batch_dim(&[], Some(4)).unwrap(), Some(4));
    }

    #[test]
    fn fresh_records_skip_known_and_repeated_ids() {
        let rec = |id: &str| VectorRecord {
            id: id.into(),
            text: id.into(),
            embedding: vec![1.0],
        };
        let known: HashSet<String> = ["b".to_string()].into();
        let out = fresh_records(vec![rec("a"), rec("b"), rec("c"), rec("a")], |id| known.contains(id));
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn k_must_be_positive() {
        assert!(check_k(0).is_err());
        assert!(check_k(1).is_ok());
    }
}
