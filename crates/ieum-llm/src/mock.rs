//! Scripted in-memory [`AssistantApi`] for tests and offline runs.
//!
//! Each `start_run` call consumes the next scripted run in FIFO order.
//! Every call is recorded so tests can assert on what reached the upstream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::json;

use crate::api::{AssistantApi, MessageAck, MessageRole, RunEvent, RunEventStream, Voice};
use crate::error::LlmError;

/// Wire name of an incremental message event.
pub const DELTA_EVENT: &str = "thread.message.delta";
/// Wire name of a terminal message event.
pub const COMPLETED_EVENT: &str = "thread.message.completed";

/// A delta event carrying `text`.
pub fn delta_event(text: &str) -> RunEvent {
    let data = json!({
        "id": "msg_mock",
        "object": "thread.message.delta",
        "delta": { "content": [{ "index": 0, "type": "text", "text": { "value": text } }] }
    });
    RunEvent::new(DELTA_EVENT, data.to_string())
}

/// A completed event carrying the full answer `text`.
pub fn completed_event(text: &str) -> RunEvent {
    let data = json!({
        "id": "msg_mock",
        "object": "thread.message",
        "role": "assistant",
        "content": [{ "type": "text", "text": { "value": text, "annotations": [] } }]
    });
    RunEvent::new(COMPLETED_EVENT, data.to_string())
}

/// What one `start_run` call produces.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Emit these items, then end the stream.
    Events(Vec<Result<RunEvent, LlmError>>),
    /// Emit these events, then never complete.
    Stall(Vec<RunEvent>),
    /// Reject the run request itself.
    Fail(LlmError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub thread: String,
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    pub thread: String,
    pub assistant_id: String,
}

#[derive(Default)]
struct MockState {
    runs: VecDeque<ScriptedRun>,
    thread_seq: u32,
    created_threads: Vec<String>,
    posted: Vec<PostedMessage>,
    started: Vec<StartedRun>,
    speech: Vec<(Voice, String)>,
    message_failure: Option<LlmError>,
    thread_failure: Option<LlmError>,
    speech_failure: Option<LlmError>,
    event_delay: Option<Duration>,
}

/// In-memory assistant service with scripted runs.
#[derive(Clone, Default)]
pub struct MockAssistantApi {
    state: Arc<Mutex<MockState>>,
}

impl MockAssistantApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a run that streams `answer` as two deltas, then completes.
    pub fn push_answer(&self, answer: &str) -> &Self {
        let split = answer
            .char_indices()
            .nth(answer.chars().count() / 2)
            .map(|(i, _)| i)
            .unwrap_or(answer.len());
        let (head, tail) = answer.split_at(split);
        let mut events = Vec::new();
        for part in [head, tail] {
            if !part.is_empty() {
                events.push(Ok(delta_event(part)));
            }
        }
        events.push(Ok(completed_event(answer)));
        self.push_run(ScriptedRun::Events(events))
    }

    /// Queue a run that emits exactly these events.
    pub fn push_events(&self, events: Vec<RunEvent>) -> &Self {
        self.push_run(ScriptedRun::Events(events.into_iter().map(Ok).collect()))
    }

    pub fn push_run(&self, run: ScriptedRun) -> &Self {
        self.state().runs.push_back(run);
        self
    }

    pub fn fail_create_message(&self, err: LlmError) -> &Self {
        self.state().message_failure = Some(err);
        self
    }

    pub fn fail_create_thread(&self, err: LlmError) -> &Self {
        self.state().thread_failure = Some(err);
        self
    }

    pub fn fail_speech(&self, err: LlmError) -> &Self {
        self.state().speech_failure = Some(err);
        self
    }

    /// Delay every streamed event by `delay`.
    pub fn with_event_delay(&self, delay: Duration) -> &Self {
        self.state().event_delay = Some(delay);
        self
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.state().created_threads.clone()
    }

    pub fn posted_messages(&self) -> Vec<PostedMessage> {
        self.state().posted.clone()
    }

    pub fn started_runs(&self) -> Vec<StartedRun> {
        self.state().started.clone()
    }

    pub fn speech_requests(&self) -> Vec<(Voice, String)> {
        self.state().speech.clone()
    }

    pub fn pending_runs(&self) -> usize {
        self.state().runs.len()
    }
}

fn delayed(
    items: Vec<Result<RunEvent, LlmError>>,
    delay: Option<Duration>,
) -> stream::BoxStream<'static, Result<RunEvent, LlmError>> {
    match delay {
        Some(delay) => stream::iter(items)
            .then(move |item| async move {
                tokio::time::sleep(delay).await;
                item
            })
            .boxed(),
        None => stream::iter(items).boxed(),
    }
}

#[async_trait]
impl AssistantApi for MockAssistantApi {
    async fn create_message(
        &self,
        thread: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageAck, LlmError> {
        let mut state = self.state();
        if let Some(err) = state.message_failure.clone() {
            return Err(err);
        }
        state.posted.push(PostedMessage {
            thread: thread.to_string(),
            role,
            content: content.to_string(),
        });
        Ok(MessageAck {
            id: format!("msg_mock_{}", state.posted.len()),
            thread_id: thread.to_string(),
        })
    }

    async fn start_run(
        &self,
        thread: &str,
        assistant_id: &str,
    ) -> Result<RunEventStream, LlmError> {
        let (run, delay) = {
            let mut state = self.state();
            state.started.push(StartedRun {
                thread: thread.to_string(),
                assistant_id: assistant_id.to_string(),
            });
            (state.runs.pop_front(), state.event_delay)
        };

        match run {
            Some(ScriptedRun::Events(items)) => Ok(delayed(items, delay)),
            Some(ScriptedRun::Stall(events)) => {
                let head = delayed(events.into_iter().map(Ok).collect(), delay);
                Ok(Box::pin(head.chain(stream::pending())))
            }
            Some(ScriptedRun::Fail(err)) => Err(err),
            None => Err(LlmError::Http {
                status: 500,
                body: "no scripted run".to_string(),
            }),
        }
    }

    async fn create_thread(&self) -> Result<String, LlmError> {
        let mut state = self.state();
        if let Some(err) = state.thread_failure.clone() {
            return Err(err);
        }
        state.thread_seq += 1;
        let handle = format!("thread_mock_{}", state.thread_seq);
        state.created_threads.push(handle.clone());
        Ok(handle)
    }

    async fn text_to_speech(&self, voice: Voice, text: &str) -> Result<Vec<u8>, LlmError> {
        let mut state = self.state();
        if let Some(err) = state.speech_failure.clone() {
            return Err(err);
        }
        state.speech.push((voice, text.to_string()));
        Ok(format!("audio:{}", text).into_bytes())
    }
}
