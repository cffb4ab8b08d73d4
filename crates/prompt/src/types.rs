//! Prompt types for multirag.
//!
//! This module defines the conversation entities interpolated into the
//! grounding prompt and the assembled prompt itself.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering a turn into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Caller-owned rolling window of the most recent turns.
///
/// Oldest turns are dropped once `capacity` is exceeded. The core only ever
/// reads the window through [`ConversationHistory::turns`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    capacity: usize,
    turns: VecDeque<ConversationTurn>,
}

impl ConversationHistory {
    /// Create an empty window holding at most `capacity` turns.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a turn, evicting the oldest ones beyond capacity.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Record a question and its answer as two turns.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.push(ConversationTurn::user(question));
        self.push(ConversationTurn::assistant(answer));
    }

    /// Snapshot of the window in chronological order.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// A fully assembled grounding prompt ready for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingPrompt {
    /// The complete prompt text
    pub text: String,

    /// Metadata about what went into the prompt
    pub metadata: GroundingPromptMetadata,
}

/// Metadata about an assembled prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingPromptMetadata {
    /// Number of retrieved passages included
    #[serde(rename = "contextCount")]
    pub context_count: usize,

    /// Number of history turns included
    #[serde(rename = "historyTurns")]
    pub history_turns: usize,
}
