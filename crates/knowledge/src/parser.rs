//! Source classification and plain-text extraction.

use multirag_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

pub const TEXT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "txt", "md", "markdown", "html", "htm", "rs", "py", "js", "ts", "go", "c",
    "cpp", "java", "sh", "yaml", "yml", "json", "toml",
];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Which ingestion path a source takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Image,
    Audio,
}

impl SourceKind {
    /// Classify by extension (case-insensitive). `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let ext = ext.as_str();

        if TEXT_EXTENSIONS.contains(&ext) {
            Some(Self::Text)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Some(Self::Audio)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

/// Content type classification for text sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    Code,
    PlainText,
    /// Binary office formats (PDF, DOCX)
    Document,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("rs") | Some("py") | Some("js") | Some("ts") | Some("go") | Some("c")
            | Some("cpp") | Some("java") | Some("sh") | Some("yaml") | Some("yml")
            | Some("json") | Some("toml") => Self::Code,
            Some("txt") => Self::PlainText,
            Some("pdf") | Some("docx") => Self::Document,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Code => "code",
            Self::PlainText => "text",
            Self::Document => "document",
            Self::Unknown => "unknown",
        }
    }
}

/// Read a text source and return cleaned text.
///
/// PDF and DOCX are binary containers; they need an external extractor.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    if content_type == ContentType::Document {
        return Err(AppError::Knowledge(format!(
            "No built-in text extractor for {} files ({:?}); configure an external extractor",
            content_type.as_str(),
            path
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::Code => clean_code(&raw),
        ContentType::PlainText => raw,
        ContentType::Document | ContentType::Unknown => {
            if is_likely_text(&raw) {
                raw
            } else {
                tracing::warn!("Skipping likely binary file: {:?}", path);
                return Err(AppError::Knowledge("Binary file not supported".to_string()));
            }
        }
    };

    Ok(cleaned)
}

/// Drop heading markers, rules and code fences.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip tags, scripts and styles, then collapse whitespace.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = &text[i..];
            if starts_with_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Drop line comments and blank lines.
fn clean_code(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("//") || trimmed.starts_with('#') {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_kind_classification() {
        assert_eq!(
            SourceKind::from_path(Path::new("report.pdf")),
            Some(SourceKind::Text)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("notes.DOCX")),
            Some(SourceKind::Text)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("photo.JPG")),
            Some(SourceKind::Image)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("memo.mp3")),
            Some(SourceKind::Audio)
        );
        assert_eq!(SourceKind::from_path(Path::new("archive.zip")), None);
        assert_eq!(SourceKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("file.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.rs")),
            ContentType::Code
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.pdf")),
            ContentType::Document
        );
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><body><p>Hello <b>world</b></p><script>var x = 1;</script></body></html>";
        assert_eq!(clean_html(input), "Hello world");
    }

    #[test]
    fn test_clean_html_multibyte() {
        let input = "<p>Café</p><STYLE>p { color: red }</STYLE><p>naïve</p>";
        assert_eq!(clean_html(input), "Café naïve");
    }

    #[test]
    fn test_clean_code() {
        let input = "// Comment\nfn main() {\n    println!(\"hello\");\n}";
        let output = clean_code(input);
        assert!(!output.contains("// Comment"));
        assert!(output.contains("fn main()"));
    }

    #[test]
    fn test_parse_file_reads_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.md");
        fs::write(&path, "# Title\n\nBody line").unwrap();

        assert_eq!(parse_file(&path).unwrap(), "Title\nBody line");
    }

    #[test]
    fn test_parse_file_document_needs_extractor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("paper.pdf");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let err = parse_file(&path).unwrap_err();
        assert!(err.to_string().contains("external extractor"));
    }
}
