//! Backend seam: the two-and-a-half operations the adapter needs from a
//! model server, behind a trait so tests can script the wire.

use async_trait::async_trait;
use serde::Serialize;
use shared::chat_api::{BackendError, ChatMessage};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Model metadata as reported by the server's describe endpoint.
#[derive(Debug, Clone, Default)]
pub struct ModelInfo {
    /// Capability tags, e.g. ["completion", "thinking", "vision"].
    pub capabilities: Vec<String>,
    /// Architecture parameter map; key names are the useful part here
    /// (vision models carry `*.vision.*` keys).
    pub model_info: HashMap<String, serde_json::Value>,
}

/// One streaming chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// Reasoning toggle, serialized only for parameter-mechanism models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            think: None,
        }
    }
}

/// One raw delta from the server. Backends that classify reasoning
/// themselves fill `thinking`; tag-convention models put everything in
/// `content` and leave `thinking` empty.
#[derive(Debug, Clone, Default)]
pub struct ChatChunk {
    pub thinking: String,
    pub content: String,
}

impl ChatChunk {
    pub fn is_empty(&self) -> bool {
        self.thinking.is_empty() && self.content.is_empty()
    }
}

/// A model-serving process reachable over some transport.
///
/// `chat_stream` pushes raw chunks into `tx` and returns `Ok(())` once the
/// server signals completion. A closed receiver means the consumer went
/// away (cancellation); implementations stop sending and return `Ok(())`.
/// Transport or decode failures mid-stream come back as `Err`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn describe_model(&self, model: &str) -> Result<ModelInfo, BackendError>;

    async fn list_models(&self) -> Result<Vec<String>, BackendError>;

    async fn chat_stream(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<ChatChunk>,
    ) -> Result<(), BackendError>;
}
