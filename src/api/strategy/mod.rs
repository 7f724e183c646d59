//! Component B: Backend Strategy.
//!
//! Three wire dialects share one client loop (Component C). Each dialect
//! knows how to build its request payload and how to turn one decoded SSE
//! event into a [`ParsedEvent`]; the client never branches on dialect itself.

mod chat;
mod legacy;
mod responses;

pub use chat::ChatCompletionsStrategy;
pub use legacy::LegacyCompletionsStrategy;
pub use responses::ResponsesStrategy;

use crate::api::types::{CallOverrides, Message, ReasoningState};
use crate::job::ProgressRecord;

/// What one decoded SSE event contributed to the in-progress response.
///
/// `Output` and `Conditional` are both "full text so far" events a dialect
/// may emit alongside or instead of incremental deltas; the client only
/// applies either one while no `Delta` has yet arrived for this request,
/// since once deltas are flowing they are the authoritative source.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Incremental visible text to append to the accumulated output.
    Delta(String),
    /// A complete piece of visible text, sent outside the delta stream.
    Output(String),
    /// Visible text sent conditionally on no delta having arrived yet
    /// (e.g. a non-streaming `message.content` fallback or a `.done` event
    /// carrying the full text of a field that streamed via deltas).
    Conditional(String),
    /// Stream is complete; no further events should be read.
    Done,
    /// Event carried no visible content (e.g. a role marker or empty delta).
    Skip,
}

pub trait BackendStrategy: Send + Sync {
    /// Build the JSON request body for one call, given the conversation,
    /// per-attempt overrides (e.g. escalated temperature), the job's
    /// configured knobs, and any reasoning state carried over from a prior
    /// attempt at this same chunk (empty on the first attempt).
    fn build_payload(
        &self,
        messages: &[Message],
        overrides: &CallOverrides,
        record: &ProgressRecord,
        reasoning: &ReasoningState,
        stream: bool,
    ) -> serde_json::Value;

    /// Decode one raw SSE data payload (already extracted by the frame
    /// reader) into a [`ParsedEvent`], threading reasoning accumulation
    /// through `state` when this dialect supports it.
    fn parse_event(&self, raw: &str, state: &mut ReasoningState) -> ParsedEvent;

    /// Whether this dialect round-trips encrypted reasoning blobs back to
    /// the model on the next call (see the responses dialect).
    fn supports_reasoning_roundtrip(&self) -> bool {
        false
    }

    /// The request path suffix appended to the job's configured base URL,
    /// when the URL doesn't already name a full endpoint.
    fn endpoint_hint(&self) -> &'static str;
}

/// Pick a dialect by inspecting the configured URL. Unrecognized URLs
/// default to chat-completions, the most common case.
pub fn detect(url: &str) -> Box<dyn BackendStrategy> {
    if url.contains("/responses") {
        Box::new(ResponsesStrategy)
    } else if url.contains("/completions") && !url.contains("/chat/completions") {
        Box::new(LegacyCompletionsStrategy)
    } else {
        Box::new(ChatCompletionsStrategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_responses_dialect() {
        let s = detect("https://api.example.com/v1/responses");
        assert!(s.supports_reasoning_roundtrip());
    }

    #[test]
    fn detects_legacy_dialect() {
        let s = detect("https://api.example.com/v1/completions");
        assert_eq!(s.endpoint_hint(), "/v1/completions");
    }

    #[test]
    fn defaults_to_chat_dialect() {
        let s = detect("https://api.example.com/v1/chat/completions");
        assert_eq!(s.endpoint_hint(), "/v1/chat/completions");
    }
}
