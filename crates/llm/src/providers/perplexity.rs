//! Perplexity query provider.
//!
//! Posts `{"query": ...}` and reads the `answer` field, which may be a string
//! or a list of strings. A body without an answer yields [`NO_ANSWER_SENTINEL`]
//! so the fallback policy, not this adapter, decides whether that counts.

use crate::client::{LlmClient, LlmRequest, LlmResponse, ResponseContent};
use crate::providers::{ensure_success, require_key};
use multirag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERPLEXITY_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_PERPLEXITY_MODEL: &str = "default";
pub const DEFAULT_PERPLEXITY_KEY_ENV: &str = "PERPLEXITY_API_KEY";

/// Placeholder text returned when the service sends no answer.
pub const NO_ANSWER_SENTINEL: &str = "[No answer]";

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    answer: Option<ResponseContent>,
}

/// Perplexity client.
pub struct PerplexityClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    key_env: String,
    client: reqwest::Client,
}

impl PerplexityClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_PERPLEXITY_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_PERPLEXITY_MODEL.to_string(),
            api_key,
            key_env: DEFAULT_PERPLEXITY_KEY_ENV.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_key_env(mut self, key_env: impl Into<String>) -> Self {
        self.key_env = key_env.into();
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for PerplexityClient {
    fn provider_name(&self) -> &str {
        "perplexity"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let api_key = require_key("Perplexity", self.api_key.as_deref(), &self.key_env)?;

        tracing::debug!("Sending query to Perplexity");

        let response = self
            .client
            .post(format!("{}/v1/query", self.base_url))
            .bearer_auth(api_key)
            .json(&QueryRequest {
                query: &request.prompt,
            })
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Perplexity: {}", e)))?;

        let response = ensure_success("Perplexity", response).await?;

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse Perplexity response: {}", e))
        })?;

        let content = parsed.answer.unwrap_or_else(|| {
            tracing::debug!("Perplexity response had no answer field");
            ResponseContent::from(NO_ANSWER_SENTINEL)
        });

        Ok(LlmResponse::new(content, self.model.clone()))
    }
}
