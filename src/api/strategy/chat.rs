//! Chat-completions dialect: OpenAI-compatible `/v1/chat/completions`.

use super::{BackendStrategy, ParsedEvent};
use crate::api::sse::DONE;
use crate::api::types::{CallOverrides, Message, ReasoningState};
use crate::job::ProgressRecord;
use serde_json::{json, Value};

pub struct ChatCompletionsStrategy;

impl BackendStrategy for ChatCompletionsStrategy {
    fn build_payload(
        &self,
        messages: &[Message],
        overrides: &CallOverrides,
        record: &ProgressRecord,
        _reasoning: &ReasoningState,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "messages": messages,
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
        if let Some(v) = record.top_k.value() {
            obj.insert("top_k".to_string(), json!(v));
        }
        if let Some(v) = record.presence_penalty.value() {
            obj.insert("presence_penalty".to_string(), json!(v));
        }
        if let Some(v) = record.seed.value() {
            obj.insert("seed".to_string(), json!(v));
        }
        if let Some(v) = record.reasoning_effort.value() {
            obj.insert("reasoning_effort".to_string(), json!(v));
        }
        if let Some(v) = record.enable_thinking.value() {
            obj.insert("enable_thinking".to_string(), json!(v));
        }

        body
    }

    fn parse_event(&self, raw: &str, state: &mut ReasoningState) -> ParsedEvent {
        if raw == DONE {
            return ParsedEvent::Done;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return ParsedEvent::Skip,
        };
        let choice = &value["choices"][0];
        let delta = &choice["delta"];

        let reasoning_piece = delta["reasoning_content"].as_str().or_else(|| choice["message"]["reasoning_content"].as_str());
        if let Some(piece) = reasoning_piece {
            let mut text = state.unencrypted_text.take().unwrap_or_default();
            text.push_str(piece);
            state.unencrypted_text = Some(text);
        }

        match delta["content"].as_str() {
            Some(content) if !content.is_empty() => return ParsedEvent::Delta(content.to_string()),
            _ => {}
        }
        match choice["message"]["content"].as_str() {
            Some(content) if !content.is_empty() => ParsedEvent::Conditional(content.to_string()),
            _ => ParsedEvent::Skip,
        }
    }

    fn endpoint_hint(&self) -> &'static str {
        "/v1/chat/completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Knob, PromptTuple, Role};

    fn record() -> ProgressRecord {
        ProgressRecord {
            file_name: "f".into(),
            chunk_index: 0,
            url: "http://x/v1/chat/completions".into(),
            api_key: "k".into(),
            delay: 1,
            max_attempts: 1,
            temp_increment: 0.0,
            model: Knob::enabled("gpt".to_string()),
            temperature: Knob::enabled(0.5),
            top_p: Knob::Disabled,
            top_k: Knob::Disabled,
            presence_penalty: Knob::Disabled,
            seed: Knob::Disabled,
            timeout: 1,
            system_prompt: PromptTuple::disabled(Role::System),
            prepend_prompt: PromptTuple::disabled(Role::User),
            prefill: PromptTuple::disabled(Role::Assistant),
            chunk_size: 1,
            batch_size: 1,
            parallel: 1,
            reasoning_effort: Knob::Disabled,
            enable_thinking: Knob::Disabled,
        }
    }

    #[test]
    fn payload_carries_enabled_knobs_only() {
        let strategy = ChatCompletionsStrategy;
        let messages = vec![Message::user("hi")];
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &record(), &ReasoningState::default(), true);
        assert_eq!(payload["model"], "gpt");
        assert_eq!(payload["temperature"], 0.5);
        assert!(payload.get("top_p").is_none());
    }

    #[test]
    fn override_temperature_wins_over_record() {
        let strategy = ChatCompletionsStrategy;
        let messages = vec![Message::user("hi")];
        let overrides = CallOverrides { temperature: Some(0.95) };
        let payload = strategy.build_payload(&messages, &overrides, &record(), &ReasoningState::default(), true);
        assert_eq!(payload["temperature"], 0.95);
    }

    #[test]
    fn parses_content_delta() {
        let strategy = ChatCompletionsStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"choices":[{"delta":{"content":"Beta"}}]}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Delta("Beta".to_string()));
    }

    #[test]
    fn captures_reasoning_content_without_emitting_it() {
        let strategy = ChatCompletionsStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"choices":[{"delta":{"reasoning_content":"thinking..."}}]}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Skip);
        assert_eq!(state.unencrypted_text.as_deref(), Some("thinking..."));
    }

    #[test]
    fn falls_back_to_message_content_as_conditional() {
        let strategy = ChatCompletionsStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"choices":[{"delta":{},"message":{"content":"Beta"}}]}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Conditional("Beta".to_string()));
    }

    #[test]
    fn done_sentinel_ends_stream() {
        let strategy = ChatCompletionsStrategy;
        let mut state = ReasoningState::default();
        assert_eq!(strategy.parse_event(DONE, &mut state), ParsedEvent::Done);
    }

    #[test]
    fn malformed_json_is_skipped_not_an_error() {
        let strategy = ChatCompletionsStrategy;
        let mut state = ReasoningState::default();
        assert_eq!(strategy.parse_event("not json", &mut state), ParsedEvent::Skip);
    }
}
