//! Console chat front-end over the streaming adapter.
//!
//! Reads turns from stdin, streams the classified response as it arrives
//! (thinking shown separately from the answer), and titles the conversation
//! after the first exchange. Ctrl-C during a response stops the stream
//! cooperatively; already-received content is kept.

use anyhow::Result;
use providers::{generate_title, ChatBackend, ChatCoordinator, OllamaClient};
use shared::chat_api::{CancelToken, ChatMessage, StreamEvent};
use shared::settings::ChatSettings;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = ChatSettings::from_env();
    let model = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings.default_model.clone());

    let backend: Arc<OllamaClient> = Arc::new(OllamaClient::new(settings.host.clone()));
    let coordinator = ChatCoordinator::new(backend.clone());

    match backend.list_models().await {
        Ok(models) if !models.is_empty() => {
            println!("Available models: {}", models.join(", "));
        }
        Ok(_) => println!("No models installed on {} yet.", settings.host),
        Err(e) => warn!(host = %settings.host, error = %e, "could not list models"),
    }
    println!(
        "Chatting with {}. Empty line exits, Ctrl-C stops a response.",
        model
    );

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut first_user_text: Option<String> = None;
    let mut titled = false;

    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        if first_user_text.is_none() {
            first_user_text = Some(line.to_string());
        }
        history.push(ChatMessage::user(line));

        let assistant_text =
            run_turn(&coordinator, &model, &history, settings.enable_thinking).await;
        history.push(ChatMessage::assistant(assistant_text.clone()));

        if !titled && !assistant_text.is_empty() {
            let user_text = first_user_text.as_deref().unwrap_or_default();
            let title = generate_title(&coordinator, user_text, &assistant_text, &model).await;
            println!("Title: {}", title);
            titled = true;
        }
    }

    Ok(())
}

/// Stream one response to the terminal, returning the accumulated answer
/// text (thinking output is displayed but not kept in the history).
async fn run_turn(
    coordinator: &ChatCoordinator,
    model: &str,
    history: &[ChatMessage],
    enable_thinking: bool,
) -> String {
    let (tx, mut rx) = unbounded_channel();
    let cancel = CancelToken::new();

    let stream = coordinator.stream(model, history, enable_thinking, vec![], tx, cancel.clone());
    tokio::pin!(stream);
    let mut stream_done = false;

    let mut assistant_text = String::new();
    let mut in_thinking = false;

    loop {
        tokio::select! {
            _ = &mut stream, if !stream_done => {
                stream_done = true;
            }
            event = rx.recv() => {
                match event {
                    Some(StreamEvent::Thinking(text)) => {
                        if !in_thinking {
                            print!("\n[thinking] ");
                            in_thinking = true;
                        }
                        print!("{}", text);
                        let _ = io::stdout().flush();
                    }
                    Some(StreamEvent::Content(text)) => {
                        if in_thinking {
                            println!();
                            in_thinking = false;
                        }
                        print!("{}", text);
                        assistant_text.push_str(&text);
                        let _ = io::stdout().flush();
                    }
                    Some(StreamEvent::Error(message)) => {
                        eprintln!("\nstream failed: {}", message);
                    }
                    Some(StreamEvent::Done) | None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                eprintln!("\n[stopping]");
            }
        }
    }

    println!();
    assistant_text
}
