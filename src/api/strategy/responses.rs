//! Responses dialect: `/v1/responses`, with encrypted reasoning round-trip.
//!
//! Once a content delta has been seen for a given event stream, the
//! conditional/incomplete event that some backends emit afterward is
//! skipped rather than re-parsed — matching the source's behavior of
//! trusting the first authoritative delta over a late correction. That
//! suppression is the client's job (it sees every event in order); this
//! dialect only classifies each event's kind.

use super::{BackendStrategy, ParsedEvent};
use crate::api::sse::DONE;
use crate::api::types::{CallOverrides, Content, ContentPart, Message, ReasoningState};
use crate::job::{ProgressRecord, Role};
use serde_json::{json, Value};

pub struct ResponsesStrategy;

/// Turn one chat-shaped message into a Responses-dialect input item. Role
/// decides the content-part vocabulary: assistant turns are prior output,
/// everything else is input.
fn message_to_item(message: &Message) -> Value {
    let is_output = message.role == Role::Assistant;
    let text_type = if is_output { "output_text" } else { "input_text" };

    let content: Vec<Value> = match &message.content {
        Content::Text(text) => vec![json!({ "type": text_type, "text": text })],
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": text_type, "text": text }),
                ContentPart::ImageUrl { image_url } => json!({ "type": "input_image", "image_url": image_url.url }),
            })
            .collect(),
    };

    json!({ "type": "message", "role": message.role, "content": content })
}

fn capture_reasoning_item(item: &Value, state: &mut ReasoningState) {
    if item["type"].as_str() == Some("reasoning") {
        if let Some(blob) = item["encrypted_content"].as_str() {
            state.encrypted_blob = Some(blob.to_string());
        }
    }
}

impl BackendStrategy for ResponsesStrategy {
    fn build_payload(
        &self,
        messages: &[Message],
        overrides: &CallOverrides,
        record: &ProgressRecord,
        reasoning: &ReasoningState,
        stream: bool,
    ) -> Value {
        let mut instructions: Option<String> = None;
        let mut input = Vec::new();

        if let Some(blob) = &reasoning.encrypted_blob {
            input.push(json!({ "type": "reasoning", "encrypted_content": blob }));
        }

        for message in messages {
            if message.role == Role::System && instructions.is_none() {
                instructions = Some(message.text());
                continue;
            }
            input.push(message_to_item(message));
        }

        let mut body = json!({
            "input": input,
            "stream": stream,
            "include": ["reasoning.encrypted_content"],
        });
        let obj = body.as_object_mut().unwrap();

        if let Some(instructions) = instructions {
            obj.insert("instructions".to_string(), json!(instructions));
        }
        if let Some(model) = record.model.value() {
            obj.insert("model".to_string(), json!(model));
        }
        let temperature = overrides.temperature.or_else(|| record.temperature.value().copied());
        if let Some(t) = temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(v) = record.reasoning_effort.value() {
            obj.insert("reasoning".to_string(), json!({ "effort": v }));
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

        let event_type = value["type"].as_str().unwrap_or("");
        match event_type {
            "response.output_text.delta" | "response.refusal.delta" => match value["delta"].as_str() {
                Some(d) if !d.is_empty() => ParsedEvent::Delta(d.to_string()),
                _ => ParsedEvent::Skip,
            },
            "response.output_text.done" | "response.refusal.done" => match value["text"].as_str() {
                Some(t) if !t.is_empty() => ParsedEvent::Conditional(t.to_string()),
                _ => ParsedEvent::Skip,
            },
            "response.reasoning_text.delta" => match value["delta"].as_str() {
                Some(d) if !d.is_empty() => {
                    let mut summary = state.summary.take().unwrap_or_default();
                    summary.push_str(d);
                    state.summary = Some(summary);
                    ParsedEvent::Delta(d.to_string())
                }
                _ => ParsedEvent::Skip,
            },
            "response.reasoning.encrypted_content.delta" => {
                if let Some(d) = value["delta"].as_str() {
                    let mut blob = state.encrypted_blob.take().unwrap_or_default();
                    blob.push_str(d);
                    state.encrypted_blob = Some(blob);
                }
                ParsedEvent::Skip
            }
            "response.output_item.added" | "response.output_item.done" => {
                capture_reasoning_item(&value["item"], state);
                ParsedEvent::Skip
            }
            "response.completed" => {
                if let Some(items) = value["response"]["output"].as_array() {
                    for item in items {
                        capture_reasoning_item(item, state);
                    }
                }
                ParsedEvent::Done
            }
            _ => ParsedEvent::Skip,
        }
    }

    fn supports_reasoning_roundtrip(&self) -> bool {
        true
    }

    fn endpoint_hint(&self) -> &'static str {
        "/v1/responses"
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
            url: "http://x/v1/responses".into(),
            api_key: "k".into(),
            delay: 1,
            max_attempts: 1,
            temp_increment: 0.0,
            model: Knob::Disabled,
            temperature: Knob::Disabled,
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
    fn text_delta_is_content() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.output_text.delta","delta":"Beta"}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Delta("Beta".to_string()));
    }

    #[test]
    fn reasoning_text_delta_is_captured_and_emitted() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.reasoning_text.delta","delta":"pondering"}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Delta("pondering".to_string()));
        assert_eq!(state.summary.as_deref(), Some("pondering"));
    }

    #[test]
    fn output_text_done_is_conditional() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.output_text.done","text":"Beta"}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Conditional("Beta".to_string()));
    }

    #[test]
    fn output_item_done_captures_reasoning_encrypted_content() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.output_item.done","item":{"type":"reasoning","encrypted_content":"blob123"}}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Skip);
        assert_eq!(state.encrypted_blob.as_deref(), Some("blob123"));
    }

    #[test]
    fn response_completed_walks_output_array_for_reasoning() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.completed","response":{"output":[
            {"type":"reasoning","encrypted_content":"final-blob"},
            {"type":"message","content":[{"type":"output_text","text":"Beta"}]}
        ]}}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Done);
        assert_eq!(state.encrypted_blob.as_deref(), Some("final-blob"));
    }

    #[test]
    fn encrypted_reasoning_accumulates_into_state_not_output() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let e1 = r#"{"type":"response.reasoning.encrypted_content.delta","delta":"ab"}"#;
        let e2 = r#"{"type":"response.reasoning.encrypted_content.delta","delta":"cd"}"#;
        assert_eq!(strategy.parse_event(e1, &mut state), ParsedEvent::Skip);
        assert_eq!(strategy.parse_event(e2, &mut state), ParsedEvent::Skip);
        assert_eq!(state.encrypted_blob.as_deref(), Some("abcd"));
    }

    #[test]
    fn response_completed_ends_stream() {
        let strategy = ResponsesStrategy;
        let mut state = ReasoningState::default();
        let event = r#"{"type":"response.completed"}"#;
        assert_eq!(strategy.parse_event(event, &mut state), ParsedEvent::Done);
    }

    #[test]
    fn payload_uses_input_key_and_reasoning_effort() {
        let strategy = ResponsesStrategy;
        let mut rec = record();
        rec.reasoning_effort = Knob::enabled("high".to_string());
        let messages = vec![Message::user("hi")];
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &rec, &ReasoningState::default(), true);
        assert!(payload.get("input").is_some());
        assert_eq!(payload["reasoning"]["effort"], "high");
    }

    #[test]
    fn system_message_is_hoisted_to_instructions() {
        let strategy = ResponsesStrategy;
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &record(), &ReasoningState::default(), true);
        assert_eq!(payload["instructions"], "be terse");
        let input = payload["input"].as_array().unwrap();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0]["type"], "message");
        assert_eq!(input[0]["content"][0]["type"], "input_text");
    }

    #[test]
    fn assistant_message_uses_output_text_content_type() {
        let strategy = ResponsesStrategy;
        let messages = vec![Message::assistant("prior answer")];
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &record(), &ReasoningState::default(), true);
        assert_eq!(payload["input"][0]["content"][0]["type"], "output_text");
    }

    #[test]
    fn prior_reasoning_blob_is_prepended_as_reasoning_item() {
        let strategy = ResponsesStrategy;
        let messages = vec![Message::user("continue")];
        let prior = ReasoningState { encrypted_blob: Some("carried-over".to_string()), ..Default::default() };
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &record(), &prior, true);
        let input = payload["input"].as_array().unwrap();
        assert_eq!(input[0]["type"], "reasoning");
        assert_eq!(input[0]["encrypted_content"], "carried-over");
        assert_eq!(input[1]["type"], "message");
    }

    #[test]
    fn payload_requests_encrypted_reasoning_content() {
        let strategy = ResponsesStrategy;
        let messages = vec![Message::user("hi")];
        let payload = strategy.build_payload(&messages, &CallOverrides::default(), &record(), &ReasoningState::default(), true);
        assert_eq!(payload["include"][0], "reasoning.encrypted_content");
    }
}
