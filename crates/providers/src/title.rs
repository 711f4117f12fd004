//! Chat title summarization: a constrained reuse of the streaming chat
//! primitive with reasoning forced off.

use crate::coordinator::ChatCoordinator;
use regex::Regex;
use shared::chat_api::{CancelToken, ChatMessage, StreamEvent};
use std::sync::LazyLock;
use tokio::sync::mpsc::unbounded_channel;
use tracing::debug;

static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Longest title surfaced to the UI; anything longer is cut to 47 chars
/// plus an ellipsis.
const MAX_TITLE_LEN: usize = 50;

/// Ask the model for a short conversation title based on the first
/// exchange. Never fails: network errors and empty responses fall back to
/// a truncated copy of the user's message.
pub async fn generate_title(
    coordinator: &ChatCoordinator,
    user_text: &str,
    assistant_text: &str,
    model: &str,
) -> String {
    let cleaned = strip_think_spans(assistant_text);
    let prompt = format!(
        "Based on this conversation, generate a very short, concise title \
         (maximum 5 words, no quotes):\n\n\
         User: {}\nAssistant: {}\n\nTitle:",
        excerpt(user_text, 200),
        excerpt(&cleaned, 200),
    );

    let history = vec![ChatMessage::user(prompt)];
    let (tx, mut rx) = unbounded_channel();
    coordinator
        .stream(model, &history, false, vec![], tx, CancelToken::new())
        .await;

    let mut full = String::new();
    let mut failed = false;
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Content(text) => full.push_str(&text),
            StreamEvent::Thinking(_) => {}
            StreamEvent::Error(_) => failed = true,
            StreamEvent::Done => break,
        }
    }

    // Transport failures surface as an inline marker in the content.
    if failed || full.contains("\n[Error:") {
        debug!(model, "title generation failed, using fallback");
        return fallback_title(user_text);
    }

    let title = clean_title(&full);
    if title.is_empty() {
        fallback_title(user_text)
    } else {
        title
    }
}

/// Remove `<think>…</think>` spans, including their content.
pub fn strip_think_spans(text: &str) -> String {
    THINK_SPAN.replace_all(text, "").trim().to_string()
}

fn clean_title(raw: &str) -> String {
    let stripped = strip_think_spans(raw);
    let trimmed = stripped.trim().trim_matches(['"', '\'']).trim();
    if trimmed.chars().count() > MAX_TITLE_LEN {
        let head: String = trimmed.chars().take(MAX_TITLE_LEN - 3).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

fn fallback_title(user_text: &str) -> String {
    let trimmed = user_text.trim();
    if trimmed.chars().count() > 30 {
        let head: String = trimmed.chars().take(30).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ChatCoordinator;
    use crate::testing::ScriptedBackend;
    use std::sync::Arc;

    #[test]
    fn test_think_spans_are_stripped_across_newlines() {
        let text = "<think>first\nplan\n</think>The capital is Paris.";
        assert_eq!(strip_think_spans(text), "The capital is Paris.");
    }

    #[test]
    fn test_clean_title_strips_quotes_and_tags() {
        assert_eq!(clean_title("\"Rust Basics\""), "Rust Basics");
        assert_eq!(clean_title("<think>hmm</think> 'Paris Facts' "), "Paris Facts");
    }

    #[test]
    fn test_long_title_is_cut_to_fifty_chars() {
        let raw: String = "t".repeat(60);
        let title = clean_title(&raw);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert_eq!(&title[..47], &raw[..47]);
    }

    #[test]
    fn test_fallback_truncates_user_text() {
        let long = "a".repeat(40);
        let fallback = fallback_title(&long);
        assert_eq!(fallback.chars().count(), 33);
        assert!(fallback.ends_with("..."));
        assert_eq!(fallback_title("short question"), "short question");
    }

    #[tokio::test]
    async fn test_generated_title_comes_back_cleaned() {
        let backend = ScriptedBackend::streaming(&["\"Weather", " in Oslo\"\n"]);
        let coordinator = ChatCoordinator::new(Arc::new(backend));
        let title =
            generate_title(&coordinator, "what's the weather in oslo?", "It is cold.", "plain")
                .await;
        assert_eq!(title, "Weather in Oslo");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_user_text() {
        let mut backend = ScriptedBackend::streaming(&[]);
        backend.fail_stream = Some("connection refused".into());
        let coordinator = ChatCoordinator::new(Arc::new(backend));
        let title = generate_title(&coordinator, "hello there", "answer", "plain").await;
        assert_eq!(title, "hello there");
    }

    #[tokio::test]
    async fn test_empty_response_falls_back() {
        let backend = ScriptedBackend::streaming(&[]);
        let coordinator = ChatCoordinator::new(Arc::new(backend));
        let title = generate_title(&coordinator, "tell me a joke", "ha", "plain").await;
        assert_eq!(title, "tell me a joke");
    }
}
