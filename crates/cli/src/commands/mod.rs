//! Command handlers for the multirag CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod pipeline;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
