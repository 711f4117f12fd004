//! Orchestration of one streaming chat turn: capability resolution,
//! directive injection, image attachment, and classification of the raw
//! chunk stream into ordered `StreamEvent`s.

use crate::backend::{ChatBackend, ChatRequest};
use crate::capabilities::CapabilityStore;
use crate::directives::apply_thinking_directive;
use crate::think_tags::ThinkTagParser;
use shared::chat_api::{CancelToken, ChatMessage, Role, StreamEvent, ThinkingMechanism};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::debug;

pub struct ChatCoordinator {
    backend: Arc<dyn ChatBackend>,
    capabilities: Arc<CapabilityStore>,
}

impl ChatCoordinator {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            capabilities: Arc::new(CapabilityStore::new()),
        }
    }

    /// Share a capability store across coordinators (one detection per
    /// model per session, wherever the stream is driven from).
    pub fn with_store(backend: Arc<dyn ChatBackend>, capabilities: Arc<CapabilityStore>) -> Self {
        Self {
            backend,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &Arc<CapabilityStore> {
        &self.capabilities
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Run one chat turn, pushing classified deltas into `tx`.
    ///
    /// Always terminates the event sequence with `Done` and never returns
    /// an error to the caller: a transport failure mid-stream becomes an
    /// inline `Content("\n[Error: …]")` marker. Cancellation is checked
    /// once per received chunk; on cancel, nothing further is surfaced and
    /// whatever the parser still holds is flushed so partial output
    /// survives.
    pub async fn stream(
        &self,
        model: &str,
        history: &[ChatMessage],
        enable_thinking: bool,
        images: Vec<String>,
        tx: UnboundedSender<StreamEvent>,
        cancel: CancelToken,
    ) {
        let mut messages = history.to_vec();

        // Only the newest turn carries new visual input.
        if !images.is_empty() {
            if let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == Role::User) {
                if last_user.images.is_none() {
                    last_user.images = Some(images);
                }
            }
        }

        let caps = self.capabilities.resolve(self.backend.as_ref(), model).await;
        let mechanism = caps.mechanism;

        if mechanism == ThinkingMechanism::Directive {
            messages = apply_thinking_directive(&messages, enable_thinking);
            debug!(model, enable_thinking, "applied reasoning directive");
        }

        let mut request = ChatRequest::new(model, messages);
        if mechanism == ThinkingMechanism::Parameter {
            request.think = Some(enable_thinking);
        }

        let (raw_tx, mut raw_rx) = unbounded_channel();
        let backend = Arc::clone(&self.backend);
        let transport = tokio::spawn(async move { backend.chat_stream(request, raw_tx).await });

        let mut parser = ThinkTagParser::new();
        while let Some(chunk) = raw_rx.recv().await {
            if cancel.is_cancelled() {
                break;
            }
            if !chunk.thinking.is_empty() {
                // The server classified this delta itself; forward verbatim.
                let _ = tx.send(StreamEvent::Thinking(chunk.thinking));
                if !chunk.content.is_empty() {
                    let _ = tx.send(StreamEvent::Content(chunk.content));
                }
            } else if !chunk.content.is_empty() {
                if mechanism == ThinkingMechanism::Directive {
                    for event in parser.feed(&chunk.content) {
                        let _ = tx.send(event);
                    }
                } else {
                    let _ = tx.send(StreamEvent::Content(chunk.content));
                }
            }
        }
        // Closing the raw channel tells the transport task to stop reading.
        drop(raw_rx);

        if let Some(event) = parser.finish() {
            let _ = tx.send(event);
        }

        if cancel.is_cancelled() {
            transport.abort();
        } else {
            match transport.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = tx.send(StreamEvent::Content(format!("\n[Error: {}]", e)));
                }
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(format!("stream task failed: {}", e)));
                }
            }
        }

        let _ = tx.send(StreamEvent::Done);
    }
}
