//! Legacy-completions dialect: plain `/v1/completions` (prompt in, text out).

use super::{BackendStrategy, ParsedEvent};
use crate::api::sse::DONE;
use crate::api::types::{CallOverrides, Message, ReasoningState};
use crate::job::ProgressRecord;
use serde_json::{json, Value};

pub struct LegacyCompletionsStrategy;

impl BackendStrategy for LegacyCompletionsStrategy {
    fn build_payload(
        &self,
        messages: &[Message],
        overrides: &CallOverrides,
        record: &ProgressRecord,
        _reasoning: &ReasoningState,
        stream: bool,
    ) -> Value {
        let prompt = messages.iter().map(|m| m.text()).collect::<Vec<_>>().join("\n");
        let mut body = json!({
            "prompt": prompt,
            "stream": stream,
        });
        let obj = body.as_object_mut().unwrap();

        if let Some(model) = record.model.value() {
            obj.insert("model".to_string(), json!(model));
        }
        let temperature = overrides.temperature.or_else(|| record.temperature.value().copied());
        if let Some(t) = temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(v) = record.top_p.value() {
            obj.insert("top_p".to_string(), json!(v));
        }
        if let Some(v) = record.seed.value() {
            obj.insert("seed".to_string(), json!(v));
        }

        body
    }

    fn parse_event(&self, raw: &str, _state: &mut ReasoningState) -> ParsedEvent {
        if raw == DONE {
            return ParsedEvent::Done;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return ParsedEvent::Skip,
        };
        match value["choices"][0]["text"].as_str() {
            Some(text) if !text.is_empty() => ParsedEvent::Delta(text.to_string()),
            _ => ParsedEvent::Skip,
        }
    }

    fn endpoint_hint(&self) -> &'static str {
        "/v1/completions"
    }
}
