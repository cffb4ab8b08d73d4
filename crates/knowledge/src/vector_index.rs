//! Vector index abstraction.
//!
//! Defines a trait for swappable vector storage and retrieval. Ranking is
//! reachable only through `query_top_k`; raw storage is never exposed.

use crate::index::RecordHandle;
use multirag_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Appending records whose length matches `dimension()`
/// - Returning the texts of the top-k most similar records
/// - Clearing every record while keeping the dimension
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Vector length shared by every record.
    fn dimension(&self) -> usize;

    /// Append a record. Fails with `DimensionMismatch` on a wrong-length vector.
    fn insert(&self, id: Option<String>, vector: Vec<f32>, text: String) -> AppResult<RecordHandle>;

    /// Texts of the most similar records, best first, at most `k` of them.
    fn query_top_k(&self, query: &[f32], k: usize) -> AppResult<Vec<String>>;

    /// Remove every record.
    fn clear(&self);

    /// Number of stored records.
    fn size(&self) -> usize;
}
