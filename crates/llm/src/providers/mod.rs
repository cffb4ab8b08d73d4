//! Provider adapters, one per backing service.
//!
//! Every adapter turns transport failures, non-2xx statuses and malformed
//! bodies into `AppError::Llm` and hands back a [`crate::LlmResponse`].

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod perplexity;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use perplexity::PerplexityClient;

use multirag_core::{AppError, AppResult};

/// Pass successful responses through, turn anything else into an error.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(AppError::Llm(format!(
        "{} API error ({}): {}",
        provider,
        status,
        error_text.trim()
    )))
}

/// Borrow the API key or explain which variable should have provided it.
pub(crate) fn require_key<'a>(
    provider: &str,
    api_key: Option<&'a str>,
    key_env: &str,
) -> AppResult<&'a str> {
    api_key.ok_or_else(|| {
        AppError::Llm(format!(
            "{} API key is not configured ({} is not set)",
            provider, key_env
        ))
    })
}
