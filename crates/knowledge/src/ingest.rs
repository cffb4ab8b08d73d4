//! Ingestion collaborators and source identities.
//!
//! Extraction of text, image vectors and transcripts sits behind traits so
//! heavyweight backends can be plugged into a session without this crate
//! depending on them.

use crate::parser;
use async_trait::async_trait;
use multirag_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Extracts plain text from a document.
///
/// Implementations may block; the session calls them on the blocking pool.
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    fn extract_text(&self, path: &Path) -> AppResult<String>;
}

/// Built-in extractor for UTF-8 sources (plain text, Markdown, HTML, code).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract_text(&self, path: &Path) -> AppResult<String> {
        parser::parse_file(path)
    }
}

/// Raw image handed to an [`ImageEmbedder`].
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// File name, used for the stored text payload
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Read an image file.
    pub async fn load(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::Knowledge(format!("Failed to read image {:?}: {}", path, e))
        })?;
        Ok(Self {
            name: file_name(path),
            bytes,
        })
    }

    /// Text payload stored alongside the image vector.
    pub fn placeholder(&self) -> String {
        format!("<Image embedding stored: {}>", self.name)
    }
}

/// Produces a vector for an image.
///
/// The vector length must equal the session's text embedding dimension so
/// images and text share one index.
#[async_trait]
pub trait ImageEmbedder: Send + Sync + std::fmt::Debug {
    fn dimensions(&self) -> usize;

    async fn embed_image(&self, image: &ImageInput) -> AppResult<Vec<f32>>;
}

/// Converts speech audio to text.
#[async_trait]
pub trait AudioTranscriber: Send + Sync + std::fmt::Debug {
    async fn transcribe(&self, path: &Path) -> AppResult<String>;
}

/// Identity of a file source: its canonical path.
pub fn path_identity(path: &Path) -> AppResult<String> {
    let canonical = path.canonicalize().map_err(|e| {
        AppError::Knowledge(format!("Cannot resolve source path {:?}: {}", path, e))
    })?;
    Ok(canonical.to_string_lossy().into_owned())
}

/// Identity of inline text: `sha256:<hex digest>`.
pub fn content_identity(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_identity_is_stable() {
        let a = content_identity("hello");
        assert_eq!(a, content_identity("hello"));
        assert_ne!(a, content_identity("hello "));
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_path_identity_canonicalizes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.txt");
        std::fs::write(&path, "x").unwrap();

        let direct = path_identity(&path).unwrap();
        let dotted = path_identity(&temp.path().join(".").join("doc.txt")).unwrap();
        assert_eq!(direct, dotted);
    }

    #[test]
    fn test_path_identity_missing_file() {
        assert!(path_identity(Path::new("/definitely/not/here.txt")).is_err());
    }

    #[tokio::test]
    async fn test_image_input_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cat.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = ImageInput::load(&path).await.unwrap();
        assert_eq!(image.bytes.len(), 4);
        assert_eq!(image.placeholder(), "<Image embedding stored: cat.png>");
    }

    #[test]
    fn test_file_text_extractor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "plain words").unwrap();

        assert_eq!(FileTextExtractor.extract_text(&path).unwrap(), "plain words");
    }
}
