//! Google Gemini provider.
//!
//! API: https://ai.google.dev/api/generate-content
//! Gemini answers with a list of parts; they surface as response fragments.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ResponseContent};
use crate::providers::{ensure_success, require_key};
use multirag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    key_env: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GEMINI_URL, api_key, model)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            key_env: DEFAULT_GEMINI_KEY_ENV.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_key_env(mut self, key_env: impl Into<String>) -> Self {
        self.key_env = key_env.into();
        self
    }

    fn to_gemini_request<'a>(&self, request: &'a LlmRequest) -> GenerateRequest<'a> {
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some()
        {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let api_key = require_key("Gemini", self.api_key.as_deref(), &self.key_env)?;

        tracing::debug!("Sending generateContent request to Gemini ({})", self.model);

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.to_gemini_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        let response = ensure_success("Gemini", response).await?;

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let candidate = generated
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Gemini response contained no candidates".to_string()))?;

        let fragments: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let usage = generated
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse::new(ResponseContent::Fragments(fragments), self.model.clone())
            .with_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_gemini_parts_become_fragments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Line one"}, {"text": "Line two"}]
                    }
                }],
                "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 4}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(
            server.uri(),
            Some("g-key".to_string()),
            "gemini-2.5-flash",
        );
        let response = client.complete(&LlmRequest::new("Hi")).await.unwrap();

        assert_eq!(
            response.content,
            ResponseContent::Fragments(vec!["Line one".to_string(), "Line two".to_string()])
        );
        assert_eq!(response.content.into_text(), "Line one\nLine two");
    }

    #[tokio::test]
    async fn test_gemini_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(server.uri(), Some("k".to_string()), "m");
        let err = client.complete(&LlmRequest::new("Hi")).await.unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[tokio::test]
    async fn test_gemini_missing_key() {
        let client = GeminiClient::new(None, DEFAULT_GEMINI_MODEL);
        let err = client.complete(&LlmRequest::new("Hi")).await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY is not set"));
    }

    #[test]
    fn test_generation_config_omitted_by_default() {
        let client = GeminiClient::new(None, "m");
        let request = LlmRequest::new("Hi");
        let json = serde_json::to_value(client.to_gemini_request(&request)).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hi");
    }
}
