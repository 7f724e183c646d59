//! Component C: LLM Client.
//!
//! One operation, `complete`, drives a single streaming call end to end:
//! build the dialect-specific payload, send it, frame the SSE body
//! (Component A), decode each event through the dialect's [`BackendStrategy`]
//! (Component B), and return the accumulated text plus any reasoning state.
//!
//! Two timeout regimes, matching verbose vs. quiet CLI runs:
//! - `Idle`: resets on every chunk received off the wire; used when progress
//!   is visible to a human and a stalled-but-not-dead connection shouldn't
//!   be killed just because the whole response is slow.
//! - `Hard`: one bound covering the entire call, start to finish.

pub mod sse;
pub mod strategy;
pub mod types;

pub use strategy::{BackendStrategy, ParsedEvent};
pub use types::{CallOverrides, Content, ContentPart, ImageUrl, Message, ReasoningState};

use crate::cancel::{CancelState, CancelToken};
use crate::errors::{EngineError, Result};
use crate::job::ProgressRecord;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum TimeoutMode {
    Idle(Duration),
    Hard(Duration),
}

const USER_AGENT_VALUE: &str = concat!("llmloom/", env!("CARGO_PKG_VERSION"));

pub struct LlmClient {
    http: reqwest::Client,
    keep_alive: bool,
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new(false)
    }
}

impl LlmClient {
    pub fn new(keep_alive: bool) -> Self {
        Self { http: reqwest::Client::new(), keep_alive }
    }

    /// Run one streaming call to completion. `overrides` carries the
    /// retry loop's escalated temperature; `reasoning` carries any
    /// reasoning state accumulated by a prior attempt at this same chunk
    /// (read by dialects that round-trip it) and is replaced with this
    /// attempt's own reasoning state on return; `cancel` is shared with
    /// the batch processor driving this call.
    pub async fn complete(
        &self,
        messages: &[Message],
        record: &ProgressRecord,
        overrides: &CallOverrides,
        reasoning: &mut ReasoningState,
        timeout_mode: TimeoutMode,
        cancel: &CancelToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(EngineError::AbortErr("cancelled before request was sent".to_string()));
        }

        let strategy = strategy::detect(&record.url);
        let payload = strategy.build_payload(messages, overrides, record, reasoning, true);
        let mut request = self.http.post(&record.url).bearer_auth(&record.api_key).header("User-Agent", USER_AGENT_VALUE).json(&payload);
        if !self.keep_alive {
            request = request.header("Connection", "close");
        }

        let response = match timeout_mode {
            TimeoutMode::Hard(d) => tokio::time::timeout(d, request.send())
                .await
                .map_err(|_| EngineError::TimeoutError(d))?
                .map_err(|e| EngineError::NetworkError(e.to_string()))?,
            TimeoutMode::Idle(_) => request.send().await.map_err(|e| EngineError::NetworkError(e.to_string()))?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body_text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
                .unwrap_or(body_text);
            return Err(EngineError::LlmApiError { status, message });
        }

        let mut stream = response.bytes_stream();
        let mut reader = sse::SseFrameReader::new();
        let mut output = String::new();
        let mut fresh_reasoning = ReasoningState::default();
        let mut delta_seen = false;
        let mut saw_done = false;
        let mut cancelled_requested = false;

        loop {
            if cancel.is_forceful() {
                return Err(EngineError::AbortErr("cancelled mid-stream".to_string()));
            }

            let next = match timeout_mode {
                TimeoutMode::Idle(d) => match tokio::time::timeout(d, stream.next()).await {
                    Ok(v) => v,
                    Err(_) => return Err(EngineError::TimeoutError(d)),
                },
                TimeoutMode::Hard(_) => stream.next().await,
            };

            let chunk = match next {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => return Err(EngineError::NetworkError(e.to_string())),
                None => break,
            };

            let mut done = false;
            for event in reader.push(&chunk) {
                match strategy.parse_event(&event, &mut fresh_reasoning) {
                    ParsedEvent::Delta(text) => {
                        output.push_str(&text);
                        delta_seen = true;
                    }
                    ParsedEvent::Output(text) | ParsedEvent::Conditional(text) => {
                        if !delta_seen {
                            output.push_str(&text);
                        }
                    }
                    ParsedEvent::Done => {
                        saw_done = true;
                        done = true;
                    }
                    ParsedEvent::Skip => {}
                }
                if done {
                    break;
                }
            }
            if done {
                break;
            }

            if cancel.state() == CancelState::Requested {
                cancelled_requested = true;
                break;
            }
        }

        if let Some(trailing) = reader.finish() {
            match strategy.parse_event(&trailing, &mut fresh_reasoning) {
                ParsedEvent::Delta(text) => {
                    output.push_str(&text);
                    delta_seen = true;
                }
                ParsedEvent::Output(text) | ParsedEvent::Conditional(text) => {
                    if !delta_seen {
                        output.push_str(&text);
                    }
                }
                ParsedEvent::Done => saw_done = true,
                ParsedEvent::Skip => {}
            }
        }

        *reasoning = fresh_reasoning;

        if !saw_done && !cancelled_requested {
            return Err(EngineError::StreamPrematureEnd);
        }

        if output.is_empty() && reasoning.is_empty() {
            return Err(EngineError::NullResponseBody);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Knob, PromptTuple, Role};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record(url: String) -> ProgressRecord {
        ProgressRecord {
            file_name: "f".into(),
            chunk_index: 0,
            url,
            api_key: "test-key".into(),
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

    /// Hand-rolled SSE server: good enough to exercise the client's framing
    /// and dialect decode without pulling in an HTTP mocking crate.
    async fn spawn_sse_server(body: &'static str) -> String {
        let (url, _rx) = spawn_capturing_server(body, "/v1/chat/completions").await;
        url
    }

    /// Like `spawn_sse_server`, but also hands back the raw request bytes
    /// the server received, for asserting on headers or payload contents.
    async fn spawn_capturing_server(body: &'static str, path: &'static str) -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        (format!("http://{addr}{path}"), rx)
    }

    #[tokio::test]
    async fn s1_single_chunk_echo_round_trips_content() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Beta\"}}]}\n\ndata: [DONE]\n\n";
        let url = spawn_sse_server(body).await;
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        let messages = vec![Message::user("Alpha")];
        let mut reasoning = ReasoningState::default();
        let output = client
            .complete(&messages, &record(url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel)
            .await
            .unwrap();
        assert_eq!(output, "Beta");
    }

    #[tokio::test]
    async fn forceful_cancellation_aborts_before_request() {
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        cancel.force();
        let messages = vec![Message::user("hi")];
        let mut reasoning = ReasoningState::default();
        let err = client
            .complete(
                &messages,
                &record("http://127.0.0.1:1/v1/chat/completions".to_string()),
                &CallOverrides::default(),
                &mut reasoning,
                TimeoutMode::Hard(Duration::from_secs(5)),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn empty_body_is_null_response_error() {
        let body = "data: [DONE]\n\n";
        let url = spawn_sse_server(body).await;
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        let messages = vec![Message::user("hi")];
        let mut reasoning = ReasoningState::default();
        let err = client
            .complete(&messages, &record(url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NullResponseBody);
    }

    #[tokio::test]
    async fn connection_dropped_without_done_is_premature_end() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Beta\"}}]}\n\n";
        let url = spawn_sse_server(body).await;
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        let messages = vec![Message::user("hi")];
        let mut reasoning = ReasoningState::default();
        let err = client
            .complete(&messages, &record(url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::StreamPrematureEnd);
    }

    #[tokio::test]
    async fn sends_user_agent_and_closes_connection_when_keep_alive_disabled() {
        let body = "data: [DONE]\n\n";
        let (url, rx) = spawn_capturing_server(body, "/v1/chat/completions").await;
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        let messages = vec![Message::user("hi")];
        let mut reasoning = ReasoningState::default();
        let _ = client.complete(&messages, &record(url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel).await;
        let request = rx.await.unwrap().to_lowercase();
        assert!(request.contains("user-agent: llmloom/"));
        assert!(request.contains("connection: close"));
    }

    #[tokio::test]
    async fn reasoning_round_trips_into_next_request() {
        let first_body = "data: {\"type\":\"response.completed\",\"response\":{\"output\":[{\"type\":\"reasoning\",\"encrypted_content\":\"blob-xyz\"}]}}\n\n";
        let (first_url, _rx1) = spawn_capturing_server(first_body, "/v1/responses").await;
        let client = LlmClient::new(false);
        let cancel = CancelToken::new();
        let messages = vec![Message::user("hi")];
        let mut reasoning = ReasoningState::default();

        let _ = client
            .complete(&messages, &record(first_url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel)
            .await
            .unwrap();
        assert_eq!(reasoning.encrypted_blob.as_deref(), Some("blob-xyz"));

        let second_body =
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"ok\"}\n\ndata: {\"type\":\"response.completed\"}\n\n";
        let (second_url, rx2) = spawn_capturing_server(second_body, "/v1/responses").await;
        let output = client
            .complete(&messages, &record(second_url), &CallOverrides::default(), &mut reasoning, TimeoutMode::Hard(Duration::from_secs(5)), &cancel)
            .await
            .unwrap();
        assert_eq!(output, "ok");

        let second_request = rx2.await.unwrap();
        assert!(second_request.contains("blob-xyz"));
    }
}
