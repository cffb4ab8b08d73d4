//! Ordered multi-provider answer generation.
//!
//! The orchestrator builds one grounding prompt per question, then walks its
//! providers strictly in priority order. The first provider to return a
//! usable answer wins and no later provider is consulted. Failures (errors,
//! timeouts, empty or null answers) are recorded and the next provider is
//! tried immediately; each provider gets exactly one attempt per call.
//!
//! Provider failures never escape as errors. When every provider fails the
//! caller receives a single string starting with [`FAILURE_PREFIX`].

use crate::client::{LlmClient, LlmRequest};
use multirag_core::config::LlmConfig;
use multirag_core::AppError;
use multirag_prompt::{build_grounding_prompt, ConversationTurn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Leading marker of the composite failure string.
pub const FAILURE_PREFIX: &str = "[All providers failed]";

/// Fixed result for an empty or whitespace-only question.
pub const NO_QUESTION_ANSWER: &str = "[No question supplied]";

/// Whether a string returned by [`FallbackOrchestrator::answer`] is a failure
/// marker rather than displayable answer text.
pub fn is_failure_answer(answer: &str) -> bool {
    answer.starts_with(FAILURE_PREFIX) || answer == NO_QUESTION_ANSWER
}

/// One entry in the fallback chain.
#[derive(Clone)]
pub struct ProviderSpec {
    /// Name used in logs and failure reports
    pub name: String,

    /// Lower values are tried first; ties keep registration order
    pub priority: u32,

    /// The adapter that talks to the backing service
    pub client: Arc<dyn LlmClient>,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, priority: u32, client: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            priority,
            client,
        }
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("provider", &self.client.provider_name())
            .field("model", &self.client.model_name())
            .finish()
    }
}

/// A single provider's failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

/// Knobs shared by every attempt.
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    /// Upper bound on a single provider call
    pub timeout: Duration,

    /// Normalized answers equal to one of these (case-insensitive) are failures
    pub null_answer_sentinels: Vec<String>,

    /// Sampling temperature forwarded to providers
    pub temperature: Option<f32>,

    /// Completion budget forwarded to providers
    pub max_tokens: Option<u32>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            null_answer_sentinels: vec![crate::providers::perplexity::NO_ANSWER_SENTINEL
                .to_string()],
            temperature: Some(0.3),
            max_tokens: Some(1000),
        }
    }
}

impl FallbackSettings {
    /// Derive settings from the `llm` section of the configuration.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            null_answer_sentinels: config.null_answer_sentinels.clone(),
            ..Self::default()
        }
    }

    fn matching_sentinel(&self, answer: &str) -> Option<&str> {
        self.null_answer_sentinels
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .find(|s| s.eq_ignore_ascii_case(answer))
    }
}

/// Result of one `answer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// A provider produced a usable answer.
    Answered {
        provider: String,
        text: String,
        failures: Vec<ProviderFailure>,
    },

    /// Every provider failed, in attempt order.
    Exhausted { failures: Vec<ProviderFailure> },

    /// The question was empty; no provider was consulted.
    NoQuestion,
}

impl AnswerOutcome {
    /// Render as the single string handed to presentation code.
    pub fn into_text(self) -> String {
        match self {
            Self::Answered { text, .. } => text,
            Self::Exhausted { failures } => render_exhausted(&failures),
            Self::NoQuestion => NO_QUESTION_ANSWER.to_string(),
        }
    }

    /// Failures recorded before the outcome was reached.
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::Answered { failures, .. } | Self::Exhausted { failures } => failures,
            Self::NoQuestion => &[],
        }
    }

    /// Name of the provider that answered, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Answered { provider, .. } => Some(provider),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

fn render_exhausted(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return format!("{} no providers configured", FAILURE_PREFIX);
    }

    let details = failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.message))
        .collect::<Vec<_>>()
        .join("; ");

    format!("{} {}", FAILURE_PREFIX, details)
}

/// Ordered fallback across interchangeable providers.
///
/// The provider list is fixed at construction. The orchestrator keeps no
/// state between calls.
pub struct FallbackOrchestrator {
    providers: Vec<ProviderSpec>,
    settings: FallbackSettings,
}

impl FallbackOrchestrator {
    /// Create an orchestrator; providers are sorted by priority (stable).
    pub fn new(mut providers: Vec<ProviderSpec>, settings: FallbackSettings) -> Self {
        providers.sort_by_key(|spec| spec.priority);

        tracing::debug!(
            "Fallback chain: {:?}",
            providers.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );

        Self {
            providers,
            settings,
        }
    }

    /// Provider names in attempt order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn settings(&self) -> &FallbackSettings {
        &self.settings
    }

    /// Answer a question from retrieved context and conversation history.
    ///
    /// Always returns a string: either the answer, [`NO_QUESTION_ANSWER`], or
    /// a composite failure starting with [`FAILURE_PREFIX`]. Use
    /// [`is_failure_answer`] to tell them apart.
    pub async fn answer(
        &self,
        question: &str,
        contexts: &[String],
        history: &[ConversationTurn],
    ) -> String {
        self.answer_detailed(question, contexts, history)
            .await
            .into_text()
    }

    /// Same protocol as [`Self::answer`], keeping the attempt record.
    pub async fn answer_detailed(
        &self,
        question: &str,
        contexts: &[String],
        history: &[ConversationTurn],
    ) -> AnswerOutcome {
        if question.trim().is_empty() {
            tracing::info!("Empty question; skipping providers");
            return AnswerOutcome::NoQuestion;
        }

        let prompt = build_grounding_prompt(question, contexts, history);
        let mut request = LlmRequest::new(prompt.text);
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;

        let mut failures = Vec::new();

        for spec in &self.providers {
            tracing::info!("Asking provider '{}' ({})", spec.name, spec.client.model_name());

            match self.attempt(spec, &request).await {
                Ok(text) => {
                    tracing::info!(
                        "Provider '{}' answered after {} failed attempt(s)",
                        spec.name,
                        failures.len()
                    );
                    return AnswerOutcome::Answered {
                        provider: spec.name.clone(),
                        text,
                        failures,
                    };
                }
                Err(message) => {
                    tracing::warn!("Provider '{}' failed: {}", spec.name, message);
                    failures.push(ProviderFailure {
                        provider: spec.name.clone(),
                        message,
                    });
                }
            }
        }

        tracing::error!("All {} providers failed", failures.len());
        AnswerOutcome::Exhausted { failures }
    }

    /// One bounded call to one provider, normalized to text or a failure message.
    async fn attempt(&self, spec: &ProviderSpec, request: &LlmRequest) -> Result<String, String> {
        let timeout = self.settings.timeout;

        let response = match tokio::time::timeout(timeout, spec.client.complete(request)).await {
            Err(_) => {
                tracing::warn!("Provider '{}' timed out after {:?}", spec.name, timeout);
                let error = AppError::Timeout(format!("no response after {:?}", timeout));
                return Err(error.to_string());
            }
            Ok(Err(e)) => return Err(e.to_string()),
            Ok(Ok(response)) => response,
        };

        let text = response.content.into_text();

        if text.is_empty() {
            return Err("returned an empty answer".to_string());
        }

        if let Some(sentinel) = self.settings.matching_sentinel(&text) {
            return Err(format!("returned null answer sentinel \"{}\"", sentinel));
        }

        Ok(text)
    }
}
