//! Compute-once ingestion cache.
//!
//! Maps a source identity to its extracted text and vector. The first
//! request for an identity runs the compute closure and inserts the vector
//! into the index; later requests return the stored pair untouched.

use crate::index::RecordHandle;
use crate::vector_index::VectorIndex;
use multirag_core::{AppError, AppResult};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Extracted text and vector stored for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub text: String,
    pub vector: Vec<f32>,
    pub handle: RecordHandle,
}

/// Result of [`IngestionCache::get_or_compute`].
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// The identity was already present; nothing was computed.
    Hit(Arc<CacheEntry>),
    /// The entry was computed and inserted into the index.
    Inserted(Arc<CacheEntry>),
}

impl CacheLookup {
    pub fn entry(&self) -> &CacheEntry {
        match self {
            Self::Hit(entry) | Self::Inserted(entry) => entry,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// The stored `(text, vector)` pair.
    pub fn into_pair(self) -> (String, Vec<f32>) {
        let entry = match self {
            Self::Hit(entry) | Self::Inserted(entry) => entry,
        };
        match Arc::try_unwrap(entry) {
            Ok(entry) => (entry.text, entry.vector),
            Err(shared) => (shared.text.clone(), shared.vector.clone()),
        }
    }
}

/// Identity-keyed cache in front of a vector index.
///
/// Each identity has its own in-flight lock, so concurrent requests for the
/// same identity run the closure once while other identities and read paths
/// proceed. The entry map is only locked for lookups and for the final
/// index insert plus store. Clearing the cache does not clear the index;
/// callers reset both together.
pub struct IngestionCache<K> {
    index: Arc<dyn VectorIndex>,
    entries: Mutex<HashMap<K, Arc<CacheEntry>>>,
    in_flight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> IngestionCache<K>
where
    K: Hash + Eq + Clone + Display + Send,
{
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached pair for `identity`, computing it on first use.
    ///
    /// `compute` returns `(text, vector)`. If the text is blank nothing is
    /// stored, the index is untouched and `AppError::EmptyContent` is
    /// returned, so a retry computes again. Compute and index errors are
    /// propagated the same way, leaving no entry behind.
    pub async fn get_or_compute<F, Fut>(&self, identity: K, compute: F) -> AppResult<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<(String, Vec<f32>)>>,
    {
        if let Some(entry) = self.lookup(&identity).await {
            return Ok(CacheLookup::Hit(entry));
        }

        let slot = self.acquire_slot(&identity).await;
        let result = {
            let _guard = slot.lock().await;
            self.compute_under_slot(&identity, compute).await
        };
        self.release_slot(&identity, slot).await;

        result
    }

    async fn lookup(&self, identity: &K) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.lock().await;
        let entry = entries.get(identity).map(Arc::clone);
        if entry.is_some() {
            tracing::debug!("Cache hit for {}", identity);
        }
        entry
    }

    async fn compute_under_slot<F, Fut>(&self, identity: &K, compute: F) -> AppResult<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<(String, Vec<f32>)>>,
    {
        // Another request may have finished this identity while we waited.
        if let Some(entry) = self.lookup(identity).await {
            return Ok(CacheLookup::Hit(entry));
        }

        let (text, vector) = compute().await?;

        if text.trim().is_empty() {
            tracing::warn!("No extractable content in {}", identity);
            return Err(AppError::EmptyContent(identity.to_string()));
        }

        // Insert and store under the entry lock so a reset cannot land between them.
        let mut entries = self.entries.lock().await;

        let handle = self
            .index
            .insert(Some(identity.to_string()), vector.clone(), text.clone())?;

        let entry = Arc::new(CacheEntry {
            text,
            vector,
            handle,
        });
        entries.insert(identity.clone(), Arc::clone(&entry));

        tracing::debug!("Cached {} as record {}", identity, handle);

        Ok(CacheLookup::Inserted(entry))
    }

    async fn acquire_slot(&self, identity: &K) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(
            in_flight
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn release_slot(&self, identity: &K, slot: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // Slots are only cloned under this lock: the map's copy plus ours means no waiters.
        if Arc::strong_count(&slot) == 2 {
            in_flight.remove(identity);
        }
    }

    pub async fn contains(&self, identity: &K) -> bool {
        self.entries.lock().await.contains_key(identity)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every cached entry. The index is left as is.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let dropped = entries.len();
        entries.clear();
        tracing::debug!("Cleared ingestion cache ({} entries dropped)", dropped);
    }

    /// Clear the cache and the index under one lock, so no ingest can land
    /// between the two and leave a stale hit behind.
    pub async fn reset(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.index.clear();
        tracing::debug!("Reset ingestion cache and index");
    }
}
