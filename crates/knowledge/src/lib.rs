//! Session-scoped retrieval for multirag.
//!
//! Sources are embedded once, cached by identity and kept in an in-memory
//! similarity index for the life of the process. Nothing is persisted.
//!
//! # Example
//! ```no_run
//! use multirag_core::config::EmbeddingConfig;
//! use multirag_knowledge::KnowledgeSession;
//! use std::path::PathBuf;
//!
//! # async fn example() -> multirag_core::AppResult<()> {
//! let session = KnowledgeSession::from_config(&EmbeddingConfig::default()).await?;
//! session.learn(&[PathBuf::from("docs")]).await?;
//! let passages = session.retrieve("How is the cache keyed?", 3).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod session;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheLookup, IngestionCache};
pub use embeddings::{create_provider, EmbeddingProvider, OllamaProvider, TrigramProvider};
pub use index::{cosine_similarity, RecordHandle, ScoredRecord, SimilarityIndex};
pub use ingest::{AudioTranscriber, FileTextExtractor, ImageEmbedder, ImageInput, TextExtractor};
pub use parser::SourceKind;
pub use session::KnowledgeSession;
pub use types::{IngestReport, LearnStats, SessionStats};
pub use vector_index::VectorIndex;
