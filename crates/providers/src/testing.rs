//! Scripted in-memory backend for exercising the adapter without a server.

use crate::backend::{ChatBackend, ChatChunk, ChatRequest, ModelInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::chat_api::{BackendError, CancelToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
pub struct ScriptedBackend {
    pub capabilities: Vec<String>,
    pub model_info_keys: Vec<String>,
    pub fail_describe: bool,
    /// Chunks replayed in order by `chat_stream`.
    pub chunks: Vec<ChatChunk>,
    /// When set, `chat_stream` errors out after replaying all chunks.
    pub fail_stream: Option<String>,
    /// Fire this token after replaying the chunk at the given index,
    /// yielding first so the consumer drains everything sent so far.
    pub cancel_after: Option<(usize, CancelToken)>,
    pub describe_calls: AtomicUsize,
    /// The request most recently passed to `chat_stream`.
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn describing(capabilities: Vec<String>, model_info_keys: Vec<String>) -> Self {
        Self {
            capabilities,
            model_info_keys,
            ..Self::default()
        }
    }

    pub fn failing_describe() -> Self {
        Self {
            fail_describe: true,
            ..Self::default()
        }
    }

    pub fn streaming(content_fragments: &[&str]) -> Self {
        Self {
            fail_describe: true,
            chunks: content_fragments
                .iter()
                .map(|c| ChatChunk {
                    thinking: String::new(),
                    content: c.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn describe_model(&self, _model: &str) -> Result<ModelInfo, BackendError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_describe {
            return Err(BackendError::Http("connection refused".into()));
        }
        Ok(ModelInfo {
            capabilities: self.capabilities.clone(),
            model_info: self
                .model_info_keys
                .iter()
                .map(|k| (k.clone(), serde_json::Value::Null))
                .collect(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["scripted".into()])
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<ChatChunk>,
    ) -> Result<(), BackendError> {
        *self.last_request.lock() = Some(request);
        for (i, chunk) in self.chunks.iter().enumerate() {
            if tx.send(chunk.clone()).is_err() {
                return Ok(());
            }
            if let Some((n, token)) = &self.cancel_after {
                if i == *n {
                    tokio::task::yield_now().await;
                    token.cancel();
                }
            }
        }
        if let Some(msg) = &self.fail_stream {
            return Err(BackendError::Http(msg.clone()));
        }
        Ok(())
    }
}
