//! Chat command handler.
//!
//! Line-oriented conversation over stdin. The last `historyTurns` turns are
//! sent with every question.

use crate::commands::pipeline::{emit, RagPipeline};
use clap::Args;
use multirag_core::{config::AppConfig, AppResult};
use multirag_prompt::ConversationHistory;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive conversation over documents
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Files or directories to ingest before the first question
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,
}

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatInput {
    Question(String),
    Learn(Vec<PathBuf>),
    Reset,
    Stats,
    Help,
    Quit,
    Blank,
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Blank;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "/quit" | "/exit" => Self::Quit,
            "/reset" => Self::Reset,
            "/stats" => Self::Stats,
            "/help" => Self::Help,
            "/learn" => Self::Learn(rest.split_whitespace().map(PathBuf::from).collect()),
            _ => Self::Question(line.to_string()),
        }
    }
}

const HELP: &str = "Commands: /learn <path>... | /stats | /reset | /quit";

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = RagPipeline::open(config).await?;
        pipeline.learn(&self.paths).await?;

        let mut history = ConversationHistory::new(config.retrieval.history_turns);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("{}", HELP);

        loop {
            eprint!("> ");
            std::io::stderr().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match ChatInput::parse(&line) {
                ChatInput::Blank => continue,
                ChatInput::Quit => break,
                ChatInput::Help => eprintln!("{}", HELP),
                ChatInput::Reset => {
                    history.clear();
                    pipeline.knowledge().reset().await;
                    eprintln!("Session reset");
                }
                ChatInput::Stats => {
                    let stats = pipeline.knowledge().stats().await;
                    eprintln!(
                        "{} record(s), {} cached source(s), {} dimensions ({}), {} turn(s) of history",
                        stats.records,
                        stats.cached_sources,
                        stats.dimension,
                        stats.embedder,
                        history.len()
                    );
                }
                ChatInput::Learn(paths) => {
                    if paths.is_empty() {
                        eprintln!("Usage: /learn <path>...");
                        continue;
                    }
                    let stats = pipeline.learn(&paths).await?;
                    eprintln!(
                        "Learned {} new source(s) ({} cached, {} empty, {} failed)",
                        stats.new_sources,
                        stats.cached_sources,
                        stats.empty_sources,
                        stats.failed_sources
                    );
                }
                ChatInput::Question(question) => {
                    let outcome = pipeline.ask(&question, &history.turns()).await;
                    if let Some(answer) = emit(outcome, false)? {
                        history.record_exchange(question, answer);
                    }
                }
            }
        }

        tracing::info!("Chat ended");
        Ok(())
    }
}
