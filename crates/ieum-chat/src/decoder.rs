//! Decoder for the assistant run event stream.
//!
//! Only two event names matter: `message.delta` (incremental text) and
//! `message.completed` (the full answer). The Assistants wire protocol
//! namespaces both under `thread.`; that prefix is accepted and ignored.
//! Every other event is dropped.
//!
//! A decoded stream yields zero or more partial answers followed by exactly
//! one terminal item: either the final answer or a fatal error.

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use ieum_llm::{RunEvent, RunEventStream};

use crate::error::ChatError;

const DELTA: &str = "message.delta";
const COMPLETED: &str = "message.completed";

pub const ERR_NO_CONTENT: &str = "no content in completed event";
pub const ERR_DESERIALIZE: &str = "payload deserialization failed";
pub const ERR_ENDED_EARLY: &str = "stream ended before completion";

/// A typed event recovered from the run stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    PartialAnswer(String),
    FinalAnswer(String),
}

impl DecodedEvent {
    pub fn is_final(&self) -> bool {
        matches!(self, DecodedEvent::FinalAnswer(_))
    }
}

pub struct EventStreamDecoder;

impl EventStreamDecoder {
    /// Decode one raw event.
    ///
    /// `Ok(None)` means the event carries nothing for the caller: an
    /// unrecognized name, or a delta with no content.
    pub fn decode_event(event: &RunEvent) -> Result<Option<DecodedEvent>, ChatError> {
        let name = event.name.strip_prefix("thread.").unwrap_or(&event.name);
        match name {
            DELTA => {
                let payload = parse_payload(&event.data)?;
                Ok(first_text(&payload["delta"]["content"]).map(DecodedEvent::PartialAnswer))
            }
            COMPLETED => {
                let payload = parse_payload(&event.data)?;
                first_text(&payload["content"])
                    .map(|text| Some(DecodedEvent::FinalAnswer(text)))
                    .ok_or_else(|| ChatError::UpstreamFormat(ERR_NO_CONTENT.to_string()))
            }
            _ => Ok(None),
        }
    }

    /// Decode a whole run stream.
    ///
    /// The returned stream ends right after the final answer or the first
    /// error. Upstream transport errors surface as `UpstreamUnavailable`
    /// (or `UpstreamTimeout`); an upstream that closes before completing
    /// surfaces as `UpstreamFormat`.
    pub fn decode(
        mut events: RunEventStream,
    ) -> impl Stream<Item = Result<DecodedEvent, ChatError>> + Send {
        stream! {
            while let Some(item) = events.next().await {
                let event = match item {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Run event stream failed");
                        yield Err(ChatError::from(e));
                        return;
                    }
                };
                match Self::decode_event(&event) {
                    Ok(Some(decoded)) => {
                        let done = decoded.is_final();
                        yield Ok(decoded);
                        if done {
                            return;
                        }
                    }
                    Ok(None) => debug!(event = %event.name, "Skipping run event"),
                    Err(e) => {
                        warn!(event = %event.name, error = %e, "Run event could not be decoded");
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Err(ChatError::UpstreamFormat(ERR_ENDED_EARLY.to_string()));
        }
    }

    /// Drive a run stream to completion and return only the final answer.
    pub async fn final_answer(events: RunEventStream) -> Result<String, ChatError> {
        let decoded = Self::decode(events);
        futures::pin_mut!(decoded);
        while let Some(item) = decoded.next().await {
            if let DecodedEvent::FinalAnswer(text) = item? {
                return Ok(text);
            }
        }
        Err(ChatError::UpstreamFormat(ERR_ENDED_EARLY.to_string()))
    }
}

fn parse_payload(data: &str) -> Result<Value, ChatError> {
    serde_json::from_str(data).map_err(|e| {
        debug!(error = %e, "Malformed run event payload");
        ChatError::UpstreamFormat(ERR_DESERIALIZE.to_string())
    })
}

/// `content[0].text.value`, if present.
fn first_text(content: &Value) -> Option<String> {
    content
        .get(0)?
        .get("text")?
        .get("value")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use ieum_llm::mock::{completed_event, delta_event};
    use ieum_llm::LlmError;

    fn run_of(items: Vec<Result<RunEvent, LlmError>>) -> RunEventStream {
        Box::pin(stream::iter(items))
    }

    async fn decode_all(items: Vec<Result<RunEvent, LlmError>>) -> Vec<Result<DecodedEvent, ChatError>> {
        EventStreamDecoder::decode(run_of(items)).collect().await
    }

    // ---- decode_event ----

    #[test]
    fn test_delta_emits_partial() {
        let decoded = EventStreamDecoder::decode_event(&delta_event("안녕")).unwrap();
        assert_eq!(decoded, Some(DecodedEvent::PartialAnswer("안녕".to_string())));
    }

    #[test]
    fn test_unprefixed_names_are_accepted() {
        let event = RunEvent::new("message.completed", r#"{"content":[{"text":{"value":"끝"}}]}"#);
        let decoded = EventStreamDecoder::decode_event(&event).unwrap();
        assert_eq!(decoded, Some(DecodedEvent::FinalAnswer("끝".to_string())));
    }

    #[test]
    fn test_delta_with_empty_content_emits_nothing() {
        let event = RunEvent::new("thread.message.delta", r#"{"delta":{"content":[]}}"#);
        assert_eq!(EventStreamDecoder::decode_event(&event).unwrap(), None);
    }

    #[test]
    fn test_completed_without_content_is_fatal() {
        let event = RunEvent::new("thread.message.completed", r#"{"content":[]}"#);
        let err = EventStreamDecoder::decode_event(&event).unwrap_err();
        assert!(matches!(err, ChatError::UpstreamFormat(ref m) if m == ERR_NO_CONTENT));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let event = RunEvent::new("thread.message.delta", "{not json");
        let err = EventStreamDecoder::decode_event(&event).unwrap_err();
        assert!(matches!(err, ChatError::UpstreamFormat(ref m) if m == ERR_DESERIALIZE));
    }

    #[test]
    fn test_unknown_events_are_dropped() {
        for name in ["thread.run.created", "thread.run.step.delta", "done", "message"] {
            let event = RunEvent::new(name, "[DONE]");
            assert_eq!(EventStreamDecoder::decode_event(&event).unwrap(), None);
        }
    }

    // ---- decode ----

    #[tokio::test]
    async fn test_valid_completed_yields_one_final_then_closes() {
        let out = decode_all(vec![
            Ok(RunEvent::new("thread.run.created", "{}")),
            Ok(delta_event("안녕")),
            Ok(delta_event("하세요")),
            Ok(completed_event("안녕하세요")),
            // Anything after the terminal event is never read.
            Ok(RunEvent::new("thread.message.delta", "{garbage")),
        ])
        .await;

        let out: Vec<DecodedEvent> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            out,
            vec![
                DecodedEvent::PartialAnswer("안녕".to_string()),
                DecodedEvent::PartialAnswer("하세요".to_string()),
                DecodedEvent::FinalAnswer("안녕하세요".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_completed_yields_error_and_never_final() {
        let out = decode_all(vec![
            Ok(delta_event("부분")),
            Ok(RunEvent::new("thread.message.completed", r#"{"content":[]}"#)),
        ])
        .await;

        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
        assert!(!out.iter().any(|r| matches!(r, Ok(e) if e.is_final())));
    }

    #[tokio::test]
    async fn test_empty_delta_continues_stream() {
        let out = decode_all(vec![
            Ok(RunEvent::new("thread.message.delta", r#"{"delta":{"content":[]}}"#)),
            Ok(completed_event("네")),
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &DecodedEvent::FinalAnswer("네".to_string()));
    }

    #[tokio::test]
    async fn test_transport_error_is_unavailable() {
        let out = decode_all(vec![
            Ok(delta_event("부분")),
            Err(LlmError::Network("connection reset".to_string())),
            Ok(completed_event("never")),
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(ChatError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_stream_ending_early_is_format_error() {
        let out = decode_all(vec![Ok(delta_event("부분"))]).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(ChatError::UpstreamFormat(ref m)) if m == ERR_ENDED_EARLY));
    }

    #[tokio::test]
    async fn test_final_answer_skips_partials() {
        let answer = EventStreamDecoder::final_answer(run_of(vec![
            Ok(delta_event("a")),
            Ok(completed_event("ab")),
        ]))
        .await
        .unwrap();
        assert_eq!(answer, "ab");
    }
}
