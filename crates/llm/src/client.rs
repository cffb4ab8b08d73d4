//! LLM client abstraction and request/response types.
//!
//! This module defines the capability every provider adapter implements and
//! the single response shape adapters normalize into.

use multirag_core::AppResult;
use serde::{Deserialize, Serialize};

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a new LLM request for a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Generated text as returned by a provider.
///
/// Some services answer with one string, others with a list of fragments.
/// Both deserialize into this type and collapse through [`ResponseContent::into_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseContent {
    Text(String),
    Fragments(Vec<String>),
}

impl ResponseContent {
    /// Normalize into a single trimmed string; fragments are joined by newlines.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Fragments(parts) => parts.join("\n").trim().to_string(),
        }
    }
}

impl From<String> for ResponseContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResponseContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for ResponseContent {
    fn from(parts: Vec<String>) -> Self {
        Self::Fragments(parts)
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated content
    pub content: ResponseContent,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    pub fn new(content: impl Into<ResponseContent>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: LlmUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: LlmUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for LLM providers.
///
/// Each implementation wraps one backing service and owns its request
/// construction, authentication and error translation. Errors come back as
/// `AppError::Llm` carrying a provider-specific message.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider kind (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Get the model this client generates with.
    fn model_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
