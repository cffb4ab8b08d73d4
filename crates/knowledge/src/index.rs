//! In-memory similarity index.
//!
//! Brute-force cosine search over a session-scoped corpus. Every record
//! shares the dimension fixed at construction; ranked queries are the only
//! read path so a different search structure can replace the scan later.

use crate::vector_index::VectorIndex;
use multirag_core::{AppError, AppResult};
use std::sync::{Arc, PoisonError, RwLock};

/// Added to the norm product so zero vectors score 0.0 instead of NaN.
const EPSILON: f32 = 1e-6;

/// Stable reference to an inserted record, for diagnostics.
///
/// Handles are never reused, including across clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHandle(u64);

impl RecordHandle {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored vector and its text payload. Immutable once inserted.
#[derive(Debug)]
struct Record {
    handle: RecordHandle,
    id: Option<String>,
    vector: Vec<f32>,
    text: String,
}

/// A query hit with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub handle: RecordHandle,
    pub id: Option<String>,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Default)]
struct IndexState {
    records: Vec<Arc<Record>>,
    next_handle: u64,
}

/// Fixed-dimension vector index with cosine ranking.
///
/// Reads take a shared lock; inserts and clears take an exclusive one, so
/// a query never observes a partially inserted record.
#[derive(Debug)]
pub struct SimilarityIndex {
    dim: usize,
    state: RwLock<IndexState>,
}

impl SimilarityIndex {
    /// Create an empty index. `dim` must be non-zero.
    pub fn new(dim: usize) -> AppResult<Self> {
        if dim == 0 {
            return Err(AppError::Knowledge(
                "Index dimension must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            dim,
            state: RwLock::new(IndexState::default()),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored records.
    pub fn size(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Append a record without an identity.
    pub fn insert(&self, vector: Vec<f32>, text: impl Into<String>) -> AppResult<RecordHandle> {
        self.insert_record(None, vector, text.into())
    }

    /// Append a record tagged with the identity of its source.
    pub fn insert_with_id(
        &self,
        id: impl Into<String>,
        vector: Vec<f32>,
        text: impl Into<String>,
    ) -> AppResult<RecordHandle> {
        self.insert_record(Some(id.into()), vector, text.into())
    }

    fn insert_record(
        &self,
        id: Option<String>,
        vector: Vec<f32>,
        text: String,
    ) -> AppResult<RecordHandle> {
        self.check_dim(&vector)?;
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Knowledge(
                "Vector contains non-finite values".to_string(),
            ));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let handle = RecordHandle(state.next_handle);
        state.next_handle += 1;
        state.records.push(Arc::new(Record {
            handle,
            id,
            vector,
            text,
        }));

        tracing::trace!("Inserted record {} (size={})", handle, state.records.len());

        Ok(handle)
    }

    /// Texts of the `k` records most similar to `query`, best first.
    ///
    /// Exact ties keep insertion order. An empty index yields an empty list.
    pub fn query_top_k(&self, query: &[f32], k: usize) -> AppResult<Vec<String>> {
        Ok(self
            .query_scored(query, k)?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Like [`query_top_k`](Self::query_top_k) but keeps scores and handles.
    pub fn query_scored(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredRecord>> {
        if k == 0 {
            return Err(AppError::Knowledge("top_k must be at least 1".to_string()));
        }
        self.check_dim(query)?;

        // Snapshot under the read lock so scoring runs without holding it.
        let records: Vec<Arc<Record>> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.records.clone()
        };

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .map(|record| ScoredRecord {
                handle: record.handle,
                id: record.id.clone(),
                text: record.text.clone(),
                score: cosine_similarity(query, &record.vector),
            })
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        Ok(scored)
    }

    /// Remove every record. The dimension is unchanged.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed = state.records.len();
        state.records.clear();
        tracing::debug!("Cleared similarity index ({} records removed)", removed);
    }

    fn check_dim(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dim {
            tracing::error!(
                "Vector length {} does not match index dimension {}",
                vector.len(),
                self.dim
            );
            return Err(AppError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for SimilarityIndex {
    fn dimension(&self) -> usize {
        self.dim()
    }

    fn insert(&self, id: Option<String>, vector: Vec<f32>, text: String) -> AppResult<RecordHandle> {
        self.insert_record(id, vector, text)
    }

    fn query_top_k(&self, query: &[f32], k: usize) -> AppResult<Vec<String>> {
        SimilarityIndex::query_top_k(self, query, k)
    }

    fn clear(&self) {
        SimilarityIndex::clear(self)
    }

    fn size(&self) -> usize {
        SimilarityIndex::size(self)
    }
}

/// Cosine similarity with a small epsilon in the denominator.
///
/// Returns a value in [-1, 1]; a zero vector scores 0.0 against anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON)
}
