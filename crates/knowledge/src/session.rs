//! Knowledge session: the per-process ingestion and retrieval state.
//!
//! A session owns one similarity index and the ingestion cache in front of
//! it. The index dimension is taken from the text embedding provider when
//! the session is created and never changes.

use crate::cache::{CacheLookup, IngestionCache};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::SimilarityIndex;
use crate::ingest::{
    content_identity, path_identity, AudioTranscriber, FileTextExtractor, ImageEmbedder,
    ImageInput, TextExtractor,
};
use crate::parser::SourceKind;
use crate::types::{IngestReport, LearnStats, SessionStats};
use chrono::{DateTime, Utc};
use multirag_core::config::EmbeddingConfig;
use multirag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use walkdir::WalkDir;

pub struct KnowledgeSession {
    index: Arc<SimilarityIndex>,
    cache: IngestionCache<String>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TextExtractor>,
    image_embedder: Option<Arc<dyn ImageEmbedder>>,
    transcriber: Option<Arc<dyn AudioTranscriber>>,
    last_ingest_at: Mutex<Option<DateTime<Utc>>>,
}

impl KnowledgeSession {
    /// Create an empty session around a text embedding provider.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let index = Arc::new(SimilarityIndex::new(embedder.dimensions())?);

        tracing::debug!(
            "Knowledge session using {}/{} ({} dimensions)",
            embedder.provider_name(),
            embedder.model_name(),
            index.dim()
        );

        Ok(Self {
            cache: IngestionCache::new(index.clone()),
            index,
            embedder,
            extractor: Arc::new(FileTextExtractor),
            image_embedder: None,
            transcriber: None,
            last_ingest_at: Mutex::new(None),
        })
    }

    /// Create a session with the configured embedding provider.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let embedder = create_provider(config).await?;
        Self::new(embedder)
    }

    pub fn with_text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Enable image sources. The embedder must match the index dimension.
    pub fn with_image_embedder(mut self, embedder: Arc<dyn ImageEmbedder>) -> AppResult<Self> {
        if embedder.dimensions() != self.index.dim() {
            return Err(AppError::DimensionMismatch {
                expected: self.index.dim(),
                actual: embedder.dimensions(),
            });
        }
        self.image_embedder = Some(embedder);
        Ok(self)
    }

    pub fn with_audio_transcriber(mut self, transcriber: Arc<dyn AudioTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn index(&self) -> &Arc<SimilarityIndex> {
        &self.index
    }

    pub fn dimension(&self) -> usize {
        self.index.dim()
    }

    /// Ingest one file, keyed by its canonical path.
    ///
    /// A file already ingested in this session is returned from the cache
    /// without re-reading it.
    pub async fn ingest_file(&self, path: &Path) -> AppResult<IngestReport> {
        let kind = SourceKind::from_path(path).ok_or_else(|| {
            AppError::Knowledge(format!("Unsupported file type: {:?}", path))
        })?;
        let identity = path_identity(path)?;

        tracing::debug!("Ingesting {} source {}", kind.as_str(), identity);

        let lookup = match kind {
            SourceKind::Text => {
                self.cache
                    .get_or_compute(identity.clone(), || async {
                        let text = self.extract_text(path).await?;
                        let vector = self.embed_text(&text).await?;
                        Ok((text, vector))
                    })
                    .await?
            }
            SourceKind::Image => {
                let embedder = self.image_embedder.as_ref().ok_or_else(|| {
                    AppError::Knowledge(format!(
                        "No image embedder configured; cannot ingest {:?}",
                        path
                    ))
                })?;
                self.cache
                    .get_or_compute(identity.clone(), || async {
                        let image = ImageInput::load(path).await?;
                        let vector = embedder.embed_image(&image).await?;
                        Ok((image.placeholder(), vector))
                    })
                    .await?
            }
            SourceKind::Audio => {
                let transcriber = self.transcriber.as_ref().ok_or_else(|| {
                    AppError::Knowledge(format!(
                        "No audio transcriber configured; cannot ingest {:?}",
                        path
                    ))
                })?;
                self.cache
                    .get_or_compute(identity.clone(), || async {
                        let text = transcriber.transcribe(path).await?;
                        let vector = self.embed_text(&text).await?;
                        Ok((text, vector))
                    })
                    .await?
            }
        };

        Ok(self.report(identity, kind, lookup))
    }

    /// Ingest inline text, keyed by its SHA-256 digest.
    pub async fn ingest_text(&self, label: &str, text: &str) -> AppResult<IngestReport> {
        let identity = content_identity(text);
        tracing::debug!("Ingesting text '{}' as {}", label, identity);

        let lookup = self
            .cache
            .get_or_compute(identity.clone(), || async {
                let vector = self.embed_text(text).await?;
                Ok((text.to_string(), vector))
            })
            .await?;

        Ok(self.report(identity, SourceKind::Text, lookup))
    }

    /// Ingest files and directory trees.
    ///
    /// Per-source failures are logged and counted. A dimension mismatch
    /// aborts the run since every later source would fail the same way.
    pub async fn learn(&self, paths: &[PathBuf]) -> AppResult<LearnStats> {
        let start = Instant::now();
        let mut stats = LearnStats::default();

        tracing::info!("Learning from {} path(s)", paths.len());

        for path in paths {
            if path.is_dir() {
                for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            tracing::warn!("Cannot read directory entry: {}", e);
                            stats.failed_sources += 1;
                            continue;
                        }
                    };

                    if !entry.file_type().is_file() {
                        continue;
                    }

                    if SourceKind::from_path(entry.path()).is_none() {
                        tracing::debug!("Skipping unsupported file: {:?}", entry.path());
                        stats.skipped_files += 1;
                        continue;
                    }

                    self.learn_one(entry.path(), &mut stats).await?;
                }
            } else {
                self.learn_one(path, &mut stats).await?;
            }
        }

        let duration = start.elapsed();
        stats.duration_secs = duration.as_secs_f64();

        tracing::info!(
            "Learn completed: {} new, {} cached, {} empty, {} failed, {} skipped in {:.2}s",
            stats.new_sources,
            stats.cached_sources,
            stats.empty_sources,
            stats.failed_sources,
            stats.skipped_files,
            stats.duration_secs
        );

        Ok(stats)
    }

    async fn learn_one(&self, path: &Path, stats: &mut LearnStats) -> AppResult<()> {
        match self.ingest_file(path).await {
            Ok(report) if report.cached => stats.cached_sources += 1,
            Ok(_) => stats.new_sources += 1,
            Err(e @ AppError::DimensionMismatch { .. }) => {
                tracing::error!("Aborting learn at {:?}: {}", path, e);
                return Err(e);
            }
            Err(AppError::EmptyContent(_)) => {
                tracing::warn!("No extractable content in {:?}", path);
                stats.empty_sources += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to ingest {:?}: {}", path, e);
                stats.failed_sources += 1;
            }
        }
        Ok(())
    }

    /// Texts of the `k` stored sources most similar to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<String>> {
        if k > 0 && self.index.is_empty() {
            tracing::debug!("Index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query_scored(&vector, k)?;

        if let (Some(first), Some(last)) = (hits.first(), hits.last()) {
            tracing::debug!(
                "Retrieved {} record(s) (top score: {:.3}, lowest: {:.3})",
                hits.len(),
                first.score,
                last.score
            );
        }

        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    /// Forget every source: clears the cache and the index together.
    pub async fn reset(&self) {
        self.cache.reset().await;
        *self
            .last_ingest_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        tracing::info!("Knowledge session reset");
    }

    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            records: self.index.size(),
            cached_sources: self.cache.len().await,
            dimension: self.index.dim(),
            embedder: format!(
                "{}/{}",
                self.embedder.provider_name(),
                self.embedder.model_name()
            ),
            last_ingest_at: *self
                .last_ingest_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Extractors do blocking file I/O, so they run on the blocking pool.
    async fn extract_text(&self, path: &Path) -> AppResult<String> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || extractor.extract_text(&path))
            .await
            .map_err(|e| AppError::Knowledge(format!("Text extraction task failed: {}", e)))?
    }

    /// Blank text skips embedding; the cache rejects it before insert.
    async fn embed_text(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.embedder.embed(text).await
    }

    fn report(&self, identity: String, kind: SourceKind, lookup: CacheLookup) -> IngestReport {
        if !lookup.is_hit() {
            *self
                .last_ingest_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        }

        IngestReport {
            identity,
            kind,
            handle: lookup.entry().handle,
            cached: lookup.is_hit(),
        }
    }
}

impl std::fmt::Debug for KnowledgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeSession")
            .field("dimension", &self.index.dim())
            .field("records", &self.index.size())
            .field("embedder", &self.embedder.provider_name())
            .field("images", &self.image_embedder.is_some())
            .field("audio", &self.transcriber.is_some())
            .finish()
    }
}
