//! Text embedding for the knowledge session.
//!
//! Providers turn text into fixed-length vectors; the session's index takes
//! its dimension from the provider chosen at startup.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::ollama::OllamaProvider;
pub use providers::trigram::TrigramProvider;
