//! Incremental `<think>…</think>` tag parser for models that interleave
//! reasoning with answer text in a single content stream.
//!
//! Fragment boundaries carry no meaning: a tag may arrive split across two
//! deliveries. The parser buffers just enough to recognize a marker that
//! straddles a boundary and classifies everything else immediately, so the
//! buffer never holds more than one partial marker (under 8 bytes) between
//! fragments.

use shared::chat_api::StreamEvent;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Per-stream tag scanner. Create one per chat turn; never share across
/// concurrent streams.
pub struct ThinkTagParser {
    buffer: String,
    in_thinking: bool,
}

impl Default for ThinkTagParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkTagParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            in_thinking: false,
        }
    }

    /// Feed one raw fragment. Returns the classified deltas it completes,
    /// in order. Empty deltas are never produced.
    pub fn feed(&mut self, fragment: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(fragment);
        let mut events = Vec::new();

        // A single fragment can contain several mode transitions.
        loop {
            if self.in_thinking {
                if let Some(q) = self.buffer.find(CLOSE_TAG) {
                    if q > 0 {
                        events.push(StreamEvent::Thinking(self.buffer[..q].to_string()));
                    }
                    self.buffer.drain(..q + CLOSE_TAG.len());
                    self.in_thinking = false;
                    // Trailing text in the same fragment flows out as content.
                    continue;
                }
                self.drain_unmatched(CLOSE_TAG, &mut events);
            } else {
                if let Some(p) = self.buffer.find(OPEN_TAG) {
                    if p > 0 {
                        events.push(StreamEvent::Content(self.buffer[..p].to_string()));
                    }
                    self.buffer.drain(..p + OPEN_TAG.len());
                    self.in_thinking = true;
                    continue;
                }
                self.drain_unmatched(OPEN_TAG, &mut events);
            }
            break;
        }

        events
    }

    /// End-of-stream flush: whatever is still buffered goes out in the
    /// current mode so nothing is silently dropped (an unterminated
    /// thinking span is still shown as thinking).
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.buffer);
        Some(if self.in_thinking {
            StreamEvent::Thinking(text)
        } else {
            StreamEvent::Content(text)
        })
    }

    /// No complete marker in the buffer: emit everything except a trailing
    /// run that could still turn into `marker` once more bytes arrive.
    fn drain_unmatched(&mut self, marker: &str, events: &mut Vec<StreamEvent>) {
        let keep = trailing_marker_prefix(&self.buffer, marker);
        let emit_len = self.buffer.len() - keep;
        if emit_len == 0 {
            return;
        }
        let text: String = self.buffer.drain(..emit_len).collect();
        events.push(if self.in_thinking {
            StreamEvent::Thinking(text)
        } else {
            StreamEvent::Content(text)
        });
    }
}

/// Length in bytes of the longest buffer suffix that is a proper prefix of
/// `marker`. Markers are ASCII, so the returned length always lands on a
/// char boundary.
fn trailing_marker_prefix(buffer: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(buffer.len());
    for len in (1..=max).rev() {
        if buffer.ends_with(&marker[..len]) {
            return len;
        }
    }
    0
}
