//! Prompt system for multirag.
//!
//! This crate provides:
//! - Conversation turn types and a bounded history window
//! - Deterministic grounding prompt assembly from retrieved context

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{build_grounding_prompt, CONTEXT_DELIMITER, NO_CONTEXT_NOTE, SYSTEM_INSTRUCTION};
pub use types::{
    ConversationHistory, ConversationTurn, GroundingPrompt, GroundingPromptMetadata, Role,
};
