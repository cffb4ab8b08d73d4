//! LLM provider factory.
//!
//! Builds provider adapters from configuration and assembles them into a
//! fallback chain. Secrets are resolved here, once, so adapters never touch
//! the environment while answering.

use crate::client::LlmClient;
use crate::fallback::{FallbackOrchestrator, FallbackSettings, ProviderSpec};
use crate::providers::{gemini, ollama, openai, perplexity};
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient, PerplexityClient};
use crate::types::ProviderType;
use multirag_core::config::{LlmConfig, ProviderConfig};
use multirag_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client for a configured provider entry.
///
/// The provider kind is the entry's explicit `kind`, or its name. A missing
/// API key does not fail construction: the client reports it on every call,
/// which the fallback chain records like any other provider failure.
///
/// # Errors
/// Returns `AppError::Config` if the provider kind is unknown.
pub fn create_client(name: &str, config: &ProviderConfig) -> AppResult<Arc<dyn LlmClient>> {
    let kind_str = config.kind_for(name);
    let kind = ProviderType::parse(kind_str).ok_or_else(|| {
        AppError::Config(format!("Unknown provider kind '{}' for '{}'", kind_str, name))
    })?;

    let api_key = config.resolve_api_key();
    if kind.requires_api_key() && api_key.is_none() {
        tracing::warn!(
            "Provider '{}' has no API key ({}); it will fail until one is set",
            name,
            config.api_key_env.as_deref().unwrap_or("no apiKeyEnv configured")
        );
    }

    let client: Arc<dyn LlmClient> = match kind {
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(
            config
                .endpoint
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL),
            config
                .model
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_MODEL),
        )),
        ProviderType::OpenAI => Arc::new(
            OpenAiClient::with_base_url(
                config
                    .endpoint
                    .as_deref()
                    .unwrap_or(openai::DEFAULT_OPENAI_URL),
                api_key,
                config
                    .model
                    .as_deref()
                    .unwrap_or(openai::DEFAULT_OPENAI_MODEL),
            )
            .with_key_env(key_env(config, openai::DEFAULT_OPENAI_KEY_ENV)),
        ),
        ProviderType::Gemini => Arc::new(
            GeminiClient::with_base_url(
                config
                    .endpoint
                    .as_deref()
                    .unwrap_or(gemini::DEFAULT_GEMINI_URL),
                api_key,
                config
                    .model
                    .as_deref()
                    .unwrap_or(gemini::DEFAULT_GEMINI_MODEL),
            )
            .with_key_env(key_env(config, gemini::DEFAULT_GEMINI_KEY_ENV)),
        ),
        ProviderType::Perplexity => {
            let mut client = PerplexityClient::with_base_url(
                config
                    .endpoint
                    .as_deref()
                    .unwrap_or(perplexity::DEFAULT_PERPLEXITY_URL),
                api_key,
            )
            .with_key_env(key_env(config, perplexity::DEFAULT_PERPLEXITY_KEY_ENV));
            if let Some(model) = &config.model {
                client = client.with_model(model.clone());
            }
            Arc::new(client)
        }
    };

    tracing::debug!(
        "Created {} client '{}' (model: {})",
        kind.as_str(),
        name,
        client.model_name()
    );

    Ok(client)
}

fn key_env(config: &ProviderConfig, default: &str) -> String {
    config
        .api_key_env
        .clone()
        .unwrap_or_else(|| default.to_string())
}

/// Build the fallback chain described by `config.fallback_order`.
///
/// Priority follows position in the list.
pub fn build_orchestrator(config: &LlmConfig) -> AppResult<FallbackOrchestrator> {
    if config.fallback_order.is_empty() {
        return Err(AppError::Config(
            "fallbackOrder must name at least one provider".to_string(),
        ));
    }

    let specs = config
        .fallback_order
        .iter()
        .enumerate()
        .map(|(priority, name)| {
            let provider_config = config.providers.get(name).ok_or_else(|| {
                AppError::Config(format!("No configuration for provider '{}'", name))
            })?;
            let client = create_client(name, provider_config)?;
            Ok(ProviderSpec::new(name.clone(), priority as u32, client))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(FallbackOrchestrator::new(
        specs,
        FallbackSettings::from_config(config),
    ))
}
