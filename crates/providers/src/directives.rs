//! Reasoning directive injection for models with no request-level toggle.

use shared::chat_api::{ChatMessage, Role};

/// Return a copy of `history` ready to send, with the reasoning directive
/// prepended to every user turn.
///
/// Directive models carry no memory of a previous turn's mode, so the
/// command has to be re-asserted on each user message, not just the
/// newest one. Other roles pass through untouched; the caller's history
/// is never modified.
pub fn apply_thinking_directive(history: &[ChatMessage], enable: bool) -> Vec<ChatMessage> {
    let directive = if enable { "/think" } else { "/no_think" };
    history
        .iter()
        .map(|msg| {
            let mut msg = msg.clone();
            if msg.role == Role::User {
                msg.content = format!("{}\n{}", directive, msg.content);
            }
            msg
        })
        .collect()
}
