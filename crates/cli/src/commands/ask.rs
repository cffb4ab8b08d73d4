//! Ask command handler.
//!
//! Ingests the given sources, then answers one question from them.

use crate::commands::pipeline::{emit, RagPipeline};
use clap::Args;
use multirag_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Answer a single question from documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Files or directories to ingest before answering
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.get_question()?;

        let pipeline = RagPipeline::open(config).await?;
        pipeline.learn(&self.paths).await?;

        let outcome = pipeline.ask(&question, &[]).await;
        emit(outcome, self.json)?;

        Ok(())
    }

    /// Get the question text from the argument or a file.
    fn get_question(&self) -> AppResult<String> {
        if let Some(question) = &self.question {
            return Ok(question.clone());
        }

        match &self.file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            }),
            // An empty question is answered with the fixed no-question result
            None => Ok(String::new()),
        }
    }
}
