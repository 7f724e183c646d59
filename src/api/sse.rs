//! Component A: SSE Frame Reader.
//!
//! Consumes a byte stream and yields complete event payloads. Boundaries are
//! blank lines; `data:` lines concatenate; `:`-prefixed lines are comments.
//! A `[DONE]` payload is a sentinel, not part of the accumulated text.

pub const DONE: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseFrameReader {
    buffer: String,
}

impl SseFrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly received bytes (already normalized to UTF-8 lossily by the
    /// caller) and drain any complete events now available.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = String::from_utf8_lossy(bytes).replace("\r\n", "\n").replace('\r', "\n");
        self.buffer.push_str(&text);
        self.drain_complete_events()
    }

    /// Flush any trailing partial event once the body has ended (no
    /// `\n\n` terminator, but still worth parsing if non-empty).
    pub fn finish(&mut self) -> Option<String> {
        let remaining = std::mem::take(&mut self.buffer);
        let trimmed = remaining.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(extract_data(trimmed))
        }
    }

    fn drain_complete_events(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let raw_event = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + 2..].to_string();
            events.push(extract_data(&raw_event));
        }
        events
    }
}

/// Pull the concatenated `data:` payload out of one raw SSE event block.
fn extract_data(raw_event: &str) -> String {
    let mut data_lines = Vec::new();
    for line in raw_event.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    data_lines.join("\n")
}
