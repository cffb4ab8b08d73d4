//! Tests for knowledge session ingestion, caching and retrieval.

use crate::embeddings::{EmbeddingProvider, TrigramProvider};
use crate::ingest::{AudioTranscriber, ImageEmbedder, ImageInput, TextExtractor};
use crate::parser::SourceKind;
use crate::session::KnowledgeSession;
use async_trait::async_trait;
use multirag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use tempfile::TempDir;

const DIM: usize = 64;

/// Trigram embeddings with a call counter.
#[derive(Debug)]
struct CountingEmbedder {
    inner: TrigramProvider,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: TrigramProvider::new(DIM),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        "counting"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Image embedder that reports `claimed` dimensions but returns `actual`.
#[derive(Debug)]
struct FixedImageEmbedder {
    claimed: usize,
    actual: usize,
}

#[async_trait]
impl ImageEmbedder for FixedImageEmbedder {
    fn dimensions(&self) -> usize {
        self.claimed
    }

    async fn embed_image(&self, image: &ImageInput) -> AppResult<Vec<f32>> {
        let mut vector = vec![0.0; self.actual];
        if let Some(first) = vector.first_mut() {
            *first = image.bytes.len() as f32;
        }
        Ok(vector)
    }
}

#[derive(Debug)]
struct CannedTranscriber(&'static str);

#[async_trait]
impl AudioTranscriber for CannedTranscriber {
    async fn transcribe(&self, _path: &Path) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

/// Extractor that remembers which thread it ran on.
#[derive(Debug, Default)]
struct ThreadRecordingExtractor {
    thread: Mutex<Option<ThreadId>>,
}

impl TextExtractor for ThreadRecordingExtractor {
    fn extract_text(&self, path: &Path) -> AppResult<String> {
        *self.thread.lock().unwrap() = Some(std::thread::current().id());
        Ok(std::fs::read_to_string(path)?)
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

fn trigram_session() -> KnowledgeSession {
    KnowledgeSession::new(Arc::new(TrigramProvider::new(DIM))).unwrap()
}

#[tokio::test]
async fn test_same_file_is_computed_once() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "notes.txt", "Ownership and borrowing in Rust");
    let embedder = CountingEmbedder::new();
    let session = KnowledgeSession::new(embedder.clone()).unwrap();

    let first = session.ingest_file(&path).await.unwrap();
    let second = session.ingest_file(&path).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.handle, second.handle);
    assert_eq!(first.kind, SourceKind::Text);
    assert_eq!(embedder.calls(), 1);
    assert_eq!(session.index().size(), 1);
}

#[tokio::test]
async fn test_equivalent_paths_share_identity() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "doc.md", "# Heading\nSome content");
    let session = trigram_session();

    session.ingest_file(&path).await.unwrap();
    let again = session
        .ingest_file(&temp.path().join(".").join("doc.md"))
        .await
        .unwrap();

    assert!(again.cached);
    assert_eq!(session.index().size(), 1);
}

#[tokio::test]
async fn test_empty_file_leaves_no_trace() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "blank.txt", "  \n\n ");
    let embedder = CountingEmbedder::new();
    let session = KnowledgeSession::new(embedder.clone()).unwrap();

    let err = session.ingest_file(&path).await.unwrap_err();

    assert!(matches!(err, AppError::EmptyContent(_)));
    assert_eq!(embedder.calls(), 0);
    let stats = session.stats().await;
    assert_eq!(stats.records, 0);
    assert_eq!(stats.cached_sources, 0);
    assert!(stats.last_ingest_at.is_none());
}

#[tokio::test]
async fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "archive.zip", "PK");
    let session = trigram_session();

    let err = session.ingest_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("Unsupported file type"));
}

#[tokio::test]
async fn test_image_requires_embedder() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "cat.png", "not really a png");
    let session = trigram_session();

    let err = session.ingest_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("No image embedder"));
    assert_eq!(session.index().size(), 0);
}

#[tokio::test]
async fn test_image_is_stored_with_placeholder_text() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "cat.png", "png bytes");
    let session = trigram_session()
        .with_image_embedder(Arc::new(FixedImageEmbedder {
            claimed: DIM,
            actual: DIM,
        }))
        .unwrap();

    let report = session.ingest_file(&path).await.unwrap();
    assert_eq!(report.kind, SourceKind::Image);

    let mut query = vec![0.0; DIM];
    query[0] = 1.0;
    let hits = session.index().query_top_k(&query, 1).unwrap();
    assert_eq!(hits, vec!["<Image embedding stored: cat.png>"]);
}

#[tokio::test]
async fn test_image_embedder_dimension_checked_up_front() {
    let result = trigram_session().with_image_embedder(Arc::new(FixedImageEmbedder {
        claimed: 512,
        actual: 512,
    }));

    assert!(matches!(
        result,
        Err(AppError::DimensionMismatch {
            expected: DIM,
            actual: 512
        })
    ));
}

#[tokio::test]
async fn test_audio_is_transcribed_and_embedded() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "memo.wav", "RIFF");
    let session = trigram_session()
        .with_audio_transcriber(Arc::new(CannedTranscriber("quarterly revenue meeting notes")));

    let report = session.ingest_file(&path).await.unwrap();
    assert_eq!(report.kind, SourceKind::Audio);

    let hits = session.retrieve("revenue meeting", 1).await.unwrap();
    assert_eq!(hits, vec!["quarterly revenue meeting notes"]);
}

#[tokio::test]
async fn test_ingest_text_dedupes_by_content() {
    let session = trigram_session();

    let first = session.ingest_text("pasted", "Tokio is an async runtime").await.unwrap();
    let second = session.ingest_text("pasted again", "Tokio is an async runtime").await.unwrap();
    let other = session.ingest_text("pasted", "Serde serializes data").await.unwrap();

    assert!(first.identity.starts_with("sha256:"));
    assert!(second.cached);
    assert!(!other.cached);
    assert_eq!(session.index().size(), 2);
}

#[tokio::test]
async fn test_learn_walks_directories() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "Rust ownership rules");
    write(temp.path(), "b.md", "# Cargo\nCargo builds crates");
    write(temp.path(), "nested/c.txt", "Async Rust with tokio");
    write(temp.path(), "empty.txt", "");
    write(temp.path(), "image.gif", "GIF89a");
    let missing = temp.path().join("missing.txt");
    let session = trigram_session();

    let stats = session
        .learn(&[temp.path().to_path_buf(), missing.clone()])
        .await
        .unwrap();

    assert_eq!(stats.new_sources, 3);
    assert_eq!(stats.cached_sources, 0);
    assert_eq!(stats.empty_sources, 1);
    assert_eq!(stats.failed_sources, 1);
    assert_eq!(stats.skipped_files, 1);
    assert_eq!(session.index().size(), 3);

    let again = session.learn(&[temp.path().to_path_buf()]).await.unwrap();
    assert_eq!(again.new_sources, 0);
    assert_eq!(again.cached_sources, 3);
    assert_eq!(again.ingested(), 3);
    assert_eq!(session.index().size(), 3);
}

#[tokio::test]
async fn test_learn_aborts_on_dimension_mismatch() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.png", "png");
    write(temp.path(), "b.txt", "text after the image");
    let session = trigram_session()
        .with_image_embedder(Arc::new(FixedImageEmbedder {
            claimed: DIM,
            actual: 3,
        }))
        .unwrap();

    let err = session
        .learn(&[temp.path().to_path_buf()])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DimensionMismatch { .. }));
    // Walk stopped at a.png before b.txt
    assert_eq!(session.index().size(), 0);
}

#[tokio::test]
async fn test_retrieve_ranks_relevant_source_first() {
    let session = KnowledgeSession::new(Arc::new(TrigramProvider::new(512))).unwrap();
    session
        .ingest_text("rust", "The borrow checker enforces ownership in Rust")
        .await
        .unwrap();
    session
        .ingest_text("bread", "Sourdough bread needs a long fermentation")
        .await
        .unwrap();
    session
        .ingest_text("garden", "Tomatoes grow well in sunny gardens")
        .await
        .unwrap();

    let hits = session.retrieve("How does the borrow checker work?", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], "The borrow checker enforces ownership in Rust");
}

#[tokio::test]
async fn test_retrieve_on_empty_session() {
    let embedder = CountingEmbedder::new();
    let session = KnowledgeSession::new(embedder.clone()).unwrap();

    assert!(session.retrieve("anything", 3).await.unwrap().is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_reset_clears_cache_and_index() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "a.txt", "some content");
    let session = trigram_session();

    session.ingest_file(&path).await.unwrap();
    assert!(session.stats().await.last_ingest_at.is_some());

    session.reset().await;

    let stats = session.stats().await;
    assert_eq!(stats.records, 0);
    assert_eq!(stats.cached_sources, 0);
    assert_eq!(stats.dimension, DIM);
    assert!(stats.last_ingest_at.is_none());

    // Not a stale cache hit: the file is ingested again
    let report = session.ingest_file(&path).await.unwrap();
    assert!(!report.cached);
    assert_eq!(session.index().size(), 1);
}

#[tokio::test]
async fn test_stats_snapshot() {
    let session = trigram_session();
    session.ingest_text("t", "hello there world").await.unwrap();

    let stats = session.stats().await;
    assert_eq!(stats.records, 1);
    assert_eq!(stats.cached_sources, 1);
    assert_eq!(stats.embedder, "trigram/trigram-v1");
    assert!(stats.last_ingest_at.is_some());
}

#[tokio::test]
async fn test_text_extraction_runs_on_blocking_pool() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "plain.txt", "Extracted off the runtime thread");
    let extractor = Arc::new(ThreadRecordingExtractor::default());
    let session = trigram_session().with_text_extractor(extractor.clone());

    let report = session.ingest_file(&path).await.unwrap();

    assert!(!report.cached);
    let thread = extractor.thread.lock().unwrap().unwrap();
    assert_ne!(thread, std::thread::current().id());
    assert_eq!(
        session.retrieve("runtime thread", 1).await.unwrap(),
        vec!["Extracted off the runtime thread".to_string()]
    );
}
