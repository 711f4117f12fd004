//! Per-model capability detection and the session-lifetime cache.
//!
//! Detection is two-tier: the server's describe endpoint is authoritative
//! when reachable (models it reports as thinking-capable take the request
//! parameter), and model-name keywords cover families whose reasoning is
//! only reachable through an embedded directive, or the offline case.

use crate::backend::ChatBackend;
use parking_lot::RwLock;
use shared::chat_api::{ModelCapabilities, ThinkingMechanism};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Model families with reasoning output but no API-level flag.
const THINKING_MODEL_KEYWORDS: &[&str] =
    &["qwen3", "qwen2.5", "deepseek-r1", "deepseek-v3", "qwq"];

/// Model families with image input, for the offline fallback.
const VISION_MODEL_KEYWORDS: &[&str] = &[
    "llava",
    "bakllava",
    "llava-phi",
    "moondream",
    "cogvlm",
    "llama3.2-vision",
    "gemma3",
];

fn name_matches(model: &str, keywords: &[&str]) -> bool {
    let lower = model.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Session-scoped capability cache. Shared across chat turns; entries are
/// written once per model via insert-if-absent, so racing detectors always
/// converge on a single stored result.
#[derive(Default)]
pub struct CapabilityStore {
    inner: RwLock<HashMap<String, ModelCapabilities>>,
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model: &str) -> Option<ModelCapabilities> {
        self.inner.read().get(model).copied()
    }

    /// Drop the cached entry so the next `resolve` re-detects.
    pub fn refresh(&self, model: &str) {
        self.inner.write().remove(model);
    }

    /// Cached thinking support; `false` when the model hasn't been resolved.
    pub fn supports_thinking(&self, model: &str) -> bool {
        self.get(model).map(|c| c.thinking).unwrap_or(false)
    }

    /// Cached vision support; `false` when the model hasn't been resolved.
    pub fn supports_vision(&self, model: &str) -> bool {
        self.get(model).map(|c| c.vision).unwrap_or(false)
    }

    /// Resolve capabilities for `model`, detecting on first use.
    ///
    /// Never fails: if the describe call errors, keyword detection still
    /// produces a usable answer. Duplicate concurrent detections are
    /// harmless; the first write wins and both callers see it.
    pub async fn resolve(&self, backend: &dyn ChatBackend, model: &str) -> ModelCapabilities {
        if let Some(cached) = self.get(model) {
            debug!(model, "using cached capabilities");
            return cached;
        }

        let detected = detect(backend, model).await;

        let mut store = self.inner.write();
        let entry = store.entry(model.to_string()).or_insert(detected);
        *entry
    }
}

async fn detect(backend: &dyn ChatBackend, model: &str) -> ModelCapabilities {
    match backend.describe_model(model).await {
        Ok(info) => {
            let mut caps = ModelCapabilities::default();

            // Primary signal: the server's capability tag list.
            for tag in &info.capabilities {
                let tag = tag.to_lowercase();
                if tag.contains("reasoning") || tag.contains("think") {
                    caps.thinking = true;
                    caps.mechanism = ThinkingMechanism::Parameter;
                }
                if tag.contains("vision") {
                    caps.vision = true;
                }
            }

            // Vision models also show up through architecture params.
            if info.model_info.keys().any(|k| k.to_lowercase().contains("vision")) {
                caps.vision = true;
            }

            // No API flag: reasoning-family models still think, but only
            // when told to in the prompt.
            if !caps.thinking && name_matches(model, THINKING_MODEL_KEYWORDS) {
                caps.thinking = true;
                caps.mechanism = ThinkingMechanism::Directive;
            }

            debug!(
                model,
                thinking = caps.thinking,
                vision = caps.vision,
                "detected capabilities"
            );
            caps
        }
        Err(e) => {
            warn!(model, error = %e, "describe failed, using keyword detection");
            let thinking = name_matches(model, THINKING_MODEL_KEYWORDS);
            ModelCapabilities {
                thinking,
                vision: name_matches(model, VISION_MODEL_KEYWORDS),
                mechanism: if thinking {
                    ThinkingMechanism::Directive
                } else {
                    ThinkingMechanism::None
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_api_reported_thinking_uses_parameter_mechanism() {
        let backend = ScriptedBackend::describing(
            vec!["completion".into(), "thinking".into(), "vision".into()],
            vec![],
        );
        let store = CapabilityStore::new();
        let caps = store.resolve(&backend, "some-model").await;
        assert!(caps.thinking);
        assert!(caps.vision);
        assert_eq!(caps.mechanism, ThinkingMechanism::Parameter);
    }

    #[tokio::test]
    async fn test_keyword_thinking_uses_directive_mechanism() {
        let backend = ScriptedBackend::describing(vec!["completion".into()], vec![]);
        let store = CapabilityStore::new();
        let caps = store.resolve(&backend, "qwen3:4b").await;
        assert!(caps.thinking);
        assert_eq!(caps.mechanism, ThinkingMechanism::Directive);
    }

    #[tokio::test]
    async fn test_vision_detected_from_model_info_keys() {
        let backend = ScriptedBackend::describing(
            vec![],
            vec!["clip.vision.embedding_length".into()],
        );
        let store = CapabilityStore::new();
        let caps = store.resolve(&backend, "plain-model").await;
        assert!(caps.vision);
        assert!(!caps.thinking);
    }

    #[tokio::test]
    async fn test_describe_failure_falls_back_to_keywords() {
        let backend = ScriptedBackend::failing_describe();
        let store = CapabilityStore::new();

        let caps = store.resolve(&backend, "deepseek-r1:7b").await;
        assert!(caps.thinking);
        assert_eq!(caps.mechanism, ThinkingMechanism::Directive);

        let caps = store.resolve(&backend, "llava:13b").await;
        assert!(caps.vision);
        assert!(!caps.thinking);
        assert_eq!(caps.mechanism, ThinkingMechanism::None);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_and_cached() {
        let backend = ScriptedBackend::describing(vec!["thinking".into()], vec![]);
        let store = CapabilityStore::new();

        let first = store.resolve(&backend, "m").await;
        let second = store.resolve(&backend, "m").await;
        assert_eq!(first, second);
        assert_eq!(backend.describe_calls.load(Ordering::SeqCst), 1);

        store.refresh("m");
        store.resolve(&backend, "m").await;
        assert_eq!(backend.describe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_convenience_accessors_default_to_false() {
        let store = CapabilityStore::new();
        assert!(!store.supports_thinking("never-seen"));
        assert!(!store.supports_vision("never-seen"));
    }
}
