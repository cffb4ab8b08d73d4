//! Grounding prompt assembly.
//!
//! Assembly is deterministic and infallible: empty inputs drop their block
//! instead of producing an error.

use crate::types::{ConversationTurn, GroundingPrompt, GroundingPromptMetadata};

/// Fixed instruction placed at the top of every grounding prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a document assistant. Answer only from the \
provided context. If the context is insufficient to answer, say that you don't know \
instead of guessing.";

/// Note emitted in place of the context block when retrieval found nothing.
pub const NO_CONTEXT_NOTE: &str = "No relevant content was found in the provided documents.";

/// Separator between retrieved passages.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Build the grounding prompt for one question.
///
/// Blocks, in order: system instruction, context (or [`NO_CONTEXT_NOTE`]),
/// conversation history (omitted when empty), the question.
///
/// # Example
/// ```
/// use multirag_prompt::{build_grounding_prompt, ConversationTurn};
///
/// let history = vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")];
/// let prompt = build_grounding_prompt(
///     "What is Rust?",
///     &["Rust is a systems language.".to_string()],
///     &history,
/// );
/// assert!(prompt.text.contains("USER: hi"));
/// assert!(prompt.text.ends_with("Answer:"));
/// ```
pub fn build_grounding_prompt(
    question: &str,
    contexts: &[String],
    history: &[ConversationTurn],
) -> GroundingPrompt {
    let mut blocks: Vec<String> = Vec::with_capacity(4);
    blocks.push(SYSTEM_INSTRUCTION.to_string());

    let passages: Vec<&str> = contexts
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    if passages.is_empty() {
        blocks.push(NO_CONTEXT_NOTE.to_string());
    } else {
        blocks.push(format!("Context:\n{}", build_context(&passages)));
    }

    if !history.is_empty() {
        blocks.push(format!(
            "Conversation so far:\n{}",
            render_history(history)
        ));
    }

    blocks.push(format!("Question: {}\nAnswer:", question.trim()));

    tracing::debug!(
        "Assembled grounding prompt: {} passages, {} history turns",
        passages.len(),
        history.len()
    );

    GroundingPrompt {
        text: blocks.join("\n\n"),
        metadata: GroundingPromptMetadata {
            context_count: passages.len(),
            history_turns: history.len(),
        },
    }
}

/// Join passages with numbered headers and the passage delimiter.
fn build_context(passages: &[&str]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Passage {}]\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// Render turns as `ROLE: content`, one per line, oldest first.
fn render_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
