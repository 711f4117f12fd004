pub mod chat_api;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_true() -> bool {
        true
    }

    /// Connection and model defaults for the chat client.
    ///
    /// Everything here can be overridden from the environment; see
    /// `ChatSettings::from_env`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatSettings {
        /// Base URL of the local model server, e.g. "http://127.0.0.1:11434"
        pub host: String,
        /// Model tag used when the caller doesn't pick one, e.g. "qwen3:4b"
        pub default_model: String,
        /// Whether reasoning output is requested for capable models
        #[serde(default = "default_true")]
        pub enable_thinking: bool,
    }

    impl Default for ChatSettings {
        fn default() -> Self {
            Self {
                host: "http://127.0.0.1:11434".into(),
                default_model: "qwen3:4b".into(),
                enable_thinking: true,
            }
        }
    }

    impl ChatSettings {
        /// Defaults with `OLLAMA_HOST` / `QUICKCHAT_MODEL` overrides applied.
        pub fn from_env() -> Self {
            let mut settings = Self::default();
            if let Ok(host) = std::env::var("OLLAMA_HOST") {
                if !host.trim().is_empty() {
                    settings.host = host;
                }
            }
            if let Ok(model) = std::env::var("QUICKCHAT_MODEL") {
                if !model.trim().is_empty() {
                    settings.default_model = model;
                }
            }
            settings
        }
    }
}
