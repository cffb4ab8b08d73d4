//! Configuration management for multirag.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.multirag/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Configuration is resolved once by the caller and handed to the core at
//! construction time; nothing below reads the environment mid-request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Provider kinds the factory knows how to build.
pub const KNOWN_PROVIDER_KINDS: [&str; 4] = ["openai", "gemini", "perplexity", "ollama"];

/// Whether `kind` names a provider the factory can build (case-insensitive).
pub fn is_known_provider_kind(kind: &str) -> bool {
    KNOWN_PROVIDER_KINDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(kind))
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .multirag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Answer-generation providers and fallback settings
    pub llm: LlmConfig,

    /// Retrieval settings
    pub retrieval: RetrievalConfig,

    /// Text embedding settings
    pub embedding: EmbeddingConfig,
}

/// Provider chain configuration from config.yaml.
///
/// Keys missing from the file keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider names in priority order
    #[serde(rename = "fallbackOrder")]
    pub fallback_order: Vec<String>,

    /// Per-call timeout applied to every provider
    #[serde(rename = "timeoutSecs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Answers equal to one of these count as failures
    #[serde(rename = "nullAnswerSentinels", default = "default_sentinels")]
    pub null_answer_sentinels: Vec<String>,

    /// Provider-specific configurations keyed by name
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
///
/// The provider kind defaults to the entry's name, so an entry called
/// `openai` needs no explicit `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Explicit provider kind ("openai", "gemini", "perplexity", "ollama")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom endpoint base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    /// Resolve the provider kind for an entry registered under `name`.
    pub fn kind_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.kind.as_deref().unwrap_or(name)
    }

    /// Read the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of passages handed to the answer prompt
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Conversation turns kept in the rolling window
    #[serde(rename = "historyTurns", default = "default_history_turns")]
    pub history_turns: usize,
}

/// Text embedding settings. The index dimension is taken from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint for network-backed providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    retrieval: Option<RetrievalConfig>,
    embedding: Option<EmbeddingConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sentinels() -> Vec<String> {
    vec!["[No answer]".to_string()]
}

fn default_top_k() -> usize {
    3
}

fn default_history_turns() -> usize {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                model: Some("gpt-3.5-turbo".to_string()),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                ..Default::default()
            },
        );
        providers.insert(
            "gemini".to_string(),
            ProviderConfig {
                model: Some("gemini-2.5-flash".to_string()),
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                ..Default::default()
            },
        );
        providers.insert(
            "perplexity".to_string(),
            ProviderConfig {
                api_key_env: Some("PERPLEXITY_API_KEY".to_string()),
                ..Default::default()
            },
        );

        Self {
            fallback_order: vec![
                "openai".to_string(),
                "gemini".to_string(),
                "perplexity".to_string(),
            ],
            timeout_secs: default_timeout_secs(),
            null_answer_sentinels: default_sentinels(),
            providers,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_turns: default_history_turns(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 512,
            endpoint: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, config file and defaults.
    ///
    /// Environment variables:
    /// - `MULTIRAG_WORKSPACE`: Override workspace path
    /// - `MULTIRAG_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use multirag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Fallback order: {:?}", config.llm.fallback_order);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`load`](Self::load), with an explicit workspace and config file
    /// taking precedence over the environment.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| {
            std::env::var("MULTIRAG_WORKSPACE").ok().map(PathBuf::from)
        }) {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("MULTIRAG_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        if let Some(explicit) = &config.config_file {
            if !explicit.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    explicit
                )));
            }
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.multirag_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{:?}: {}", path, msg)),
            other => other,
        })
    }

    /// Merge YAML configuration text into this config.
    pub fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        tracing::debug!(
            "Merged config: fallback order {:?}, top_k {}",
            result.llm.fallback_order,
            result.retrieval.top_k
        );

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and files.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        top_k: Option<usize>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(top_k) = top_k {
            self.retrieval.top_k = top_k;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .multirag directory.
    pub fn multirag_dir(&self) -> PathBuf {
        self.workspace.join(".multirag")
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(provider)
    }

    /// Validate the configuration before building the core.
    pub fn validate(&self) -> AppResult<()> {
        if self.llm.fallback_order.is_empty() {
            return Err(AppError::Config(
                "fallbackOrder must name at least one provider".to_string(),
            ));
        }

        for name in &self.llm.fallback_order {
            let provider_config = self.get_provider_config(name).ok_or_else(|| {
                AppError::Config(format!(
                    "Provider '{}' is in fallbackOrder but has no configuration",
                    name
                ))
            })?;

            let kind = provider_config.kind_for(name);
            if !is_known_provider_kind(kind) {
                return Err(AppError::Config(format!(
                    "Unknown provider kind '{}' for '{}'. Supported: {}",
                    kind,
                    name,
                    KNOWN_PROVIDER_KINDS.join(", ")
                )));
            }
        }

        if self.llm.timeout_secs == 0 {
            return Err(AppError::Config("timeoutSecs must be positive".to_string()));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
