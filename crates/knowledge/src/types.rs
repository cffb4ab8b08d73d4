//! Knowledge session type definitions.

use crate::index::RecordHandle;
use crate::parser::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of ingesting one source.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Cache identity of the source
    pub identity: String,

    /// Ingestion path taken
    pub kind: SourceKind,

    /// Index record holding the source
    pub handle: RecordHandle,

    /// True when the source was already cached and nothing was computed
    pub cached: bool,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnStats {
    /// Sources embedded and inserted by this run
    pub new_sources: u32,

    /// Sources already cached from an earlier run
    pub cached_sources: u32,

    /// Sources with no extractable text
    pub empty_sources: u32,

    /// Sources that failed to extract or embed
    pub failed_sources: u32,

    /// Files skipped because their type is unsupported
    pub skipped_files: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

impl LearnStats {
    /// Sources available for retrieval after this run.
    pub fn ingested(&self) -> u32 {
        self.new_sources + self.cached_sources
    }
}

/// Snapshot of a knowledge session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Records in the similarity index
    pub records: usize,

    /// Entries in the ingestion cache
    pub cached_sources: usize,

    /// Index vector dimension
    pub dimension: usize,

    /// Embedding provider and model, e.g. "trigram/trigram-v1"
    pub embedder: String,

    /// Last successful insert
    pub last_ingest_at: Option<DateTime<Utc>>,
}
