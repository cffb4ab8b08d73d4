//! Error types for multirag.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, providers, knowledge storage,
//! timeouts and the vector-shape errors raised by the index.

use thiserror::Error;

/// Unified error type for multirag.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// A vector's length does not match the index dimension.
    ///
    /// Indicates a configuration bug (embedding model and index disagree),
    /// so callers should treat it as fatal rather than retry.
    #[error("Dimension mismatch: index expects {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An ingested source produced no extractable text.
    #[error("No extractable content in source: {0}")]
    EmptyContent(String),

    /// A bounded operation did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 512,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("512"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::Timeout("no response after 2s".to_string());
        assert_eq!(err.to_string(), "Timed out: no response after 2s");
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
