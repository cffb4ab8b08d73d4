//! OpenAI chat-completions provider.
//!
//! API: https://platform.openai.com/docs/api-reference/chat/create

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::providers::{ensure_success, require_key};
use multirag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI chat-completions client.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    key_env: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_OPENAI_URL, api_key, model)
    }

    /// Create a client against a custom endpoint (proxies, compatible servers).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            key_env: DEFAULT_OPENAI_KEY_ENV.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Name of the variable reported when the key is missing.
    pub fn with_key_env(mut self, key_env: impl Into<String>) -> Self {
        self.key_env = key_env.into();
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let api_key = require_key("OpenAI", self.api_key.as_deref(), &self.key_env)?;

        tracing::debug!("Sending chat completion to OpenAI ({})", self.model);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let response = ensure_success("OpenAI", response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse::new(content, chat.model.unwrap_or_else(|| self.model.clone()))
            .with_usage(usage))
    }
}
