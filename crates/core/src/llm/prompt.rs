// crates/core/src/llm/prompt.rs
//! Active-prompt selection for single-turn tools.

use crate::error::ValidationError;

use super::types::{ConversationMessage, Role};

/// Pick the prompt to send from a conversation history.
///
/// The history must be non-empty and end with a `user` turn; that turn's
/// content is returned. Earlier turns are accepted but not transmitted, since
/// the Copilot CLI takes exactly one `--prompt` per invocation.
pub fn select_prompt(history: &[ConversationMessage]) -> Result<&str, ValidationError> {
    let last = history.last().ok_or(ValidationError::EmptyHistory)?;
    if last.role != Role::User {
        return Err(ValidationError::LastMessageNotUser { role: last.role });
    }
    Ok(&last.content)
}
