//! Provider type identification.

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Gemini,
    Perplexity,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string, ignoring case.
    ///
    /// Accepts exactly the kinds listed in `KNOWN_PROVIDER_KINDS`, which is
    /// what config validation checks against.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "gemini" => Some(Self::Gemini),
            "perplexity" => Some(Self::Perplexity),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
            Self::Ollama => "ollama",
        }
    }

    /// Whether the service rejects unauthenticated calls.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}
