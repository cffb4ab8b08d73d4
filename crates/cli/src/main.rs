//! multirag CLI
//!
//! Main entry point for the multirag command-line tool.
//! Answers questions from local documents through an ordered chain of LLM
//! providers.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand};
use multirag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// multirag - answer questions from your documents with provider fallback
#[derive(Parser, Debug)]
#[command(name = "multirag")]
#[command(about = "Answer questions from your documents with provider fallback", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MULTIRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MULTIRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Number of passages retrieved per question
    #[arg(short = 'k', long, global = true, env = "MULTIRAG_TOP_K")]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question from documents
    Ask(AskCommand),

    /// Interactive conversation over documents
    Chat(ChatCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration: flags, then environment, then config.yaml
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.log_level,
        cli.top_k,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("multirag starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Fallback order: {:?}", config.llm.fallback_order);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
