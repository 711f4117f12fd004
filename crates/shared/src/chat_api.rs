//! Message, event, and capability types shared between the adapter and its
//! callers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation. Image refs are opaque to the adapter
/// (base64 payloads in the Ollama wire format) and only the newest user
/// turn ever carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: None,
        }
    }
}

/// Classified delta surfaced to the stream consumer.
///
/// Events arrive strictly in order and each is delivered once. Every stream
/// ends with exactly one `Done`; transport failures are absorbed into an
/// inline `Content` marker before it, so consumers only ever display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Model-internal deliberation text.
    Thinking(String),
    /// Answer text.
    Content(String),
    /// Terminal marker; no further events follow.
    Done,
    /// Stream machinery failure (not a transport error; those become
    /// inline content). Still followed by `Done`.
    Error(String),
}

/// How reasoning output is toggled for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThinkingMechanism {
    /// No reasoning feature.
    #[default]
    None,
    /// Request-level boolean flag (`think: true/false`).
    Parameter,
    /// Embedded `/think` / `/no_think` command in user text.
    Directive,
}

/// Detected per-model feature set. Written once per session per model
/// unless explicitly refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelCapabilities {
    pub thinking: bool,
    pub vision: bool,
    pub mechanism: ThinkingMechanism,
}

/// Cooperative stop flag, checked once per received chunk. Cannot interrupt
/// a chunk already in flight, but guarantees nothing past it is surfaced.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Failure at the backend transport seam. Stream consumers never see this
/// type; the coordinator folds it into the event sequence.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_without_images_field() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
        assert!(json.get("images").is_none());
    }

    #[test]
    fn test_message_serializes_images_when_present() {
        let mut msg = ChatMessage::user("look at this");
        msg.images = Some(vec!["aGVsbG8=".to_string()]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_cancel_token_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
