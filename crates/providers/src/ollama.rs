//! Ollama HTTP backend: line-delimited JSON streaming over `/api/chat`,
//! model metadata over `/api/show`, model listing over `/api/tags`.

use crate::backend::{ChatBackend, ChatChunk, ChatRequest, ModelInfo};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat_api::BackendError;
use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct ShowResponse {
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    model_info: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaStreamMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize, Default)]
struct OllamaStreamMessage {
    #[serde(default)]
    thinking: String,
    #[serde(default)]
    content: String,
}

pub struct OllamaClient {
    http: Client,
    base: String,
}

impl OllamaClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            base: base.into(),
        }
    }

    /// Base URL from `OLLAMA_HOST`, falling back to the local default port.
    pub fn from_env() -> Self {
        let base =
            env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        Self::new(base)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn describe_model(&self, model: &str) -> Result<ModelInfo, BackendError> {
        let url = format!("{}/api/show", self.base);
        let resp = self
            .http
            .post(url)
            .json(&ShowRequest { model })
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BackendError::Http(format!(
                "show failed for {}: {}",
                model,
                resp.status()
            )));
        }
        let body: ShowResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(ModelInfo {
            capabilities: body.capabilities,
            model_info: body.model_info,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.base);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BackendError::Http(format!("tags failed: {}", resp.status())));
        }
        let body: TagsResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(body
            .models
            .into_iter()
            .filter_map(|m| m.model.or(m.name))
            .collect())
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<ChatChunk>,
    ) -> Result<(), BackendError> {
        let url = format!("{}/api/chat", self.base);
        let resp = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BackendError::Http(format!(
                "chat failed for {}: {}",
                request.model,
                resp.status()
            )));
        }

        // Ollama streams line-delimited JSON
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| BackendError::Http(format!("stream read: {}", e)))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // Process complete lines
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf = buf[pos + 1..].to_string();

                if line.is_empty() {
                    continue;
                }

                let parsed: OllamaStreamChunk = serde_json::from_str(&line)
                    .map_err(|e| BackendError::Decode(format!("bad stream line: {}", e)))?;

                if let Some(msg) = parsed.message {
                    let delta = ChatChunk {
                        thinking: msg.thinking,
                        content: msg.content,
                    };
                    if !delta.is_empty() && tx.send(delta).is_err() {
                        // Consumer dropped the receiver (cancel); stop reading.
                        return Ok(());
                    }
                }
                if parsed.done {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
