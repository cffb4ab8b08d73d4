//! Retrieval-augmented answering shared by `ask` and `chat`.

use multirag_core::{config::AppConfig, AppError, AppResult};
use multirag_knowledge::{KnowledgeSession, LearnStats};
use multirag_llm::{build_orchestrator, is_failure_answer, AnswerOutcome, FallbackOrchestrator};
use multirag_prompt::ConversationTurn;
use std::path::PathBuf;

/// A knowledge session wired to the provider fallback chain.
pub struct RagPipeline {
    knowledge: KnowledgeSession,
    orchestrator: FallbackOrchestrator,
    top_k: usize,
}

impl RagPipeline {
    /// Validate the configuration and build the session and provider chain.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let knowledge = KnowledgeSession::from_config(&config.embedding).await?;
        let orchestrator = build_orchestrator(&config.llm)?;

        tracing::debug!(
            "Pipeline ready: providers {:?}, top_k {}",
            orchestrator.provider_names(),
            config.retrieval.top_k
        );

        Ok(Self::new(knowledge, orchestrator, config.retrieval.top_k))
    }

    pub fn new(
        knowledge: KnowledgeSession,
        orchestrator: FallbackOrchestrator,
        top_k: usize,
    ) -> Self {
        Self {
            knowledge,
            orchestrator,
            top_k,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeSession {
        &self.knowledge
    }

    /// Ingest sources, warning when none of them could be used.
    pub async fn learn(&self, paths: &[PathBuf]) -> AppResult<LearnStats> {
        let stats = self.knowledge.learn(paths).await?;

        if !paths.is_empty() && stats.ingested() == 0 {
            tracing::warn!("No usable sources found; answers will have no document context");
        }

        Ok(stats)
    }

    /// Retrieve context for `question` and run the fallback chain.
    ///
    /// Retrieval failures do not end the turn: the question is answered
    /// without document context instead.
    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> AnswerOutcome {
        let contexts = self.contexts_for(question).await;

        tracing::debug!("Answering with {} context passage(s)", contexts.len());

        self.orchestrator
            .answer_detailed(question, &contexts, history)
            .await
    }

    async fn contexts_for(&self, question: &str) -> Vec<String> {
        if question.trim().is_empty() {
            return Vec::new();
        }

        match self.knowledge.retrieve(question, self.top_k).await {
            Ok(contexts) => contexts,
            Err(e @ AppError::DimensionMismatch { .. }) => {
                tracing::error!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
        }
    }
}

/// Print an outcome: answers to stdout, failure answers to stderr.
///
/// Returns the answer text when a provider answered.
pub fn emit(outcome: AnswerOutcome, json: bool) -> AppResult<Option<String>> {
    if json {
        let output = serde_json::json!({
            "answered": outcome.is_answered(),
            "provider": outcome.provider(),
            "failures": outcome.failures(),
            "answer": outcome.clone().into_text(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(answered_text(outcome));
    }

    for failure in outcome.failures() {
        tracing::debug!("Provider '{}' failed: {}", failure.provider, failure.message);
    }

    let answered = outcome.is_answered();
    let text = outcome.into_text();

    if !answered || is_failure_answer(&text) {
        eprintln!("warning: no usable answer");
        eprintln!("{}", text);
        return Ok(None);
    }

    println!("{}", text);
    Ok(Some(text))
}

fn answered_text(outcome: AnswerOutcome) -> Option<String> {
    match outcome {
        AnswerOutcome::Answered { text, .. } => Some(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use multirag_knowledge::EmbeddingProvider;
    use multirag_llm::{
        FallbackSettings, LlmClient, LlmRequest, LlmResponse, ProviderFailure, ProviderSpec,
    };
    use multirag_prompt::NO_CONTEXT_NOTE;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const DIM: usize = 4;

    /// Embeds successfully for a fixed number of calls, then errors.
    #[derive(Debug)]
    struct FlakyEmbedder {
        healthy_calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn provider_name(&self) -> &str {
            "flaky"
        }

        fn model_name(&self) -> &str {
            "flaky-v1"
        }

        fn dimensions(&self) -> usize {
            DIM
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let remaining = self.healthy_calls.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(AppError::Knowledge(
                    "Ollama API error (503 Service Unavailable): ".to_string(),
                ));
            }
            self.healthy_calls.store(remaining - 1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }
    }

    /// Answers every prompt and keeps a copy of each one.
    #[derive(Default)]
    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "recording-model"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok(LlmResponse::new("grounded answer", "recording-model"))
        }
    }

    fn pipeline(healthy_calls: usize) -> (RagPipeline, Arc<RecordingClient>) {
        let embedder = Arc::new(FlakyEmbedder {
            healthy_calls: AtomicUsize::new(healthy_calls),
        });
        let knowledge = KnowledgeSession::new(embedder).unwrap();
        let client = Arc::new(RecordingClient::default());
        let orchestrator = FallbackOrchestrator::new(
            vec![ProviderSpec::new("recording", 1, client.clone())],
            FallbackSettings::default(),
        );
        (RagPipeline::new(knowledge, orchestrator, 3), client)
    }

    #[tokio::test]
    async fn test_ask_uses_retrieved_context() {
        let (pipeline, client) = pipeline(2);
        pipeline
            .knowledge()
            .ingest_text("notes", "The cache is keyed by canonical path.")
            .await
            .unwrap();

        let outcome = pipeline.ask("How is the cache keyed?", &[]).await;

        assert_eq!(outcome.provider(), Some("recording"));
        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("keyed by canonical path"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_still_answers() {
        let (pipeline, client) = pipeline(1);
        pipeline
            .knowledge()
            .ingest_text("notes", "Only the ingest embedding succeeds.")
            .await
            .unwrap();

        let first = pipeline.ask("What?", &[]).await;
        let second = pipeline.ask("And now?", &[]).await;

        assert!(first.is_answered());
        assert!(second.is_answered());
        assert_eq!(second.clone().into_text(), "grounded answer");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| p.contains(NO_CONTEXT_NOTE)));
        assert_eq!(pipeline.knowledge().index().size(), 1);
    }

    #[test]
    fn test_answered_text() {
        let outcome = AnswerOutcome::Answered {
            provider: "gemini".to_string(),
            text: "42".to_string(),
            failures: vec![ProviderFailure {
                provider: "openai".to_string(),
                message: "rate limited".to_string(),
            }],
        };
        assert_eq!(answered_text(outcome), Some("42".to_string()));
        assert_eq!(answered_text(AnswerOutcome::NoQuestion), None);
    }

    #[test]
    fn test_emit_failure_returns_none() {
        let outcome = AnswerOutcome::Exhausted {
            failures: vec![ProviderFailure {
                provider: "openai".to_string(),
                message: "boom".to_string(),
            }],
        };
        assert_eq!(emit(outcome, false).unwrap(), None);
        assert_eq!(emit(AnswerOutcome::NoQuestion, true).unwrap(), None);
    }
}
