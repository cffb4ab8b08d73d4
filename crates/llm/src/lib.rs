//! LLM integration crate for multirag.
//!
//! This crate provides a provider-agnostic abstraction for text generation
//! and an ordered fallback chain across providers.
//!
//! # Providers
//! - **OpenAI**: chat completions
//! - **Gemini**: `generateContent`
//! - **Perplexity**: query endpoint
//! - **Ollama**: local runtime
//!
//! # Example
//! ```no_run
//! use multirag_core::config::LlmConfig;
//! use multirag_llm::{build_orchestrator, is_failure_answer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = build_orchestrator(&LlmConfig::default())?;
//! let answer = orchestrator
//!     .answer("What is Rust?", &["Rust is a systems language.".to_string()], &[])
//!     .await;
//! if !is_failure_answer(&answer) {
//!     println!("{}", answer);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod fallback;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ResponseContent};
pub use factory::{build_orchestrator, create_client};
pub use fallback::{
    is_failure_answer, AnswerOutcome, FallbackOrchestrator, FallbackSettings, ProviderFailure,
    ProviderSpec, FAILURE_PREFIX, NO_QUESTION_ANSWER,
};
pub use providers::{GeminiClient, OllamaClient, OpenAiClient, PerplexityClient};
pub use types::ProviderType;
