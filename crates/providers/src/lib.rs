//! Streaming chat protocol adapter for a local model server.
//!
//! The pipeline: [`coordinator::ChatCoordinator`] resolves per-model
//! capabilities through [`capabilities::CapabilityStore`], rewrites history
//! with [`directives::apply_thinking_directive`] where needed, issues the
//! backend call, and classifies the live token stream (via
//! [`think_tags::ThinkTagParser`] for tag-convention models) into ordered
//! `StreamEvent`s. [`title::generate_title`] reuses the same primitive with
//! reasoning forced off.

pub mod backend;
pub mod capabilities;
pub mod coordinator;
pub mod directives;
pub mod ollama;
pub mod think_tags;
pub mod title;

#[cfg(test)]
mod testing;

pub use backend::{ChatBackend, ChatChunk, ChatRequest, ModelInfo};
pub use capabilities::CapabilityStore;
pub use coordinator::ChatCoordinator;
pub use ollama::OllamaClient;
pub use think_tags::ThinkTagParser;
pub use title::generate_title;
