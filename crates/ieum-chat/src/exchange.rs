//! Message exchange: post the user's message, run the assistant, collect the
//! answer, persist the USER/AI pair.
//!
//! Persistence happens only once the final answer arrives. Any upstream
//! failure before that leaves storage untouched.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use ieum_core::types::{format_chat_timestamp, Gender, Message, MessageType};
use ieum_llm::{AssistantApi, MessageRole, Voice};
use ieum_storage::{Database, MessageRepository};

use crate::decoder::{DecodedEvent, EventStreamDecoder};
use crate::error::ChatError;
use crate::types::{AudioAnswer, StreamChunk};

/// Outbound stream of answer chunks. Ends after the terminal chunk or the
/// first error.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ChatError>> + Send>>;

/// Everything one exchange needs, resolved by the chat entry flow.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub elderly_id: Uuid,
    pub thread: String,
    pub content: String,
    pub assistant_id: String,
}

/// A persisted exchange.
#[derive(Debug, Clone)]
pub struct CompletedExchange {
    pub answer: String,
    pub user_created_at: DateTime<Utc>,
    pub ai_created_at: DateTime<Utc>,
}

pub struct MessageExchangeCoordinator {
    api: Arc<dyn AssistantApi>,
    db: Arc<Database>,
    run_timeout: Duration,
}

impl MessageExchangeCoordinator {
    pub fn new(api: Arc<dyn AssistantApi>, db: Arc<Database>, run_timeout: Duration) -> Self {
        Self {
            api,
            db,
            run_timeout,
        }
    }

    /// Streaming exchange.
    ///
    /// The returned stream is cold: nothing is sent upstream until it is
    /// polled. Dropping it mid-answer drops the upstream connection and
    /// persists nothing.
    pub fn stream(&self, request: ExchangeRequest) -> ChatStream {
        let api = self.api.clone();
        let db = self.db.clone();

        Box::pin(stream! {
            if let Err(e) = api
                .create_message(&request.thread, MessageRole::User, &request.content)
                .await
            {
                warn!(elderly_id = %request.elderly_id, error = %e, "Posting user message failed");
                yield Err(ChatError::from(e));
                return;
            }

            let events = match api.start_run(&request.thread, &request.assistant_id).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(elderly_id = %request.elderly_id, error = %e, "Starting run failed");
                    yield Err(ChatError::from(e));
                    return;
                }
            };

            let decoded = EventStreamDecoder::decode(events);
            futures::pin_mut!(decoded);
            while let Some(item) = decoded.next().await {
                match item {
                    Ok(DecodedEvent::PartialAnswer(text)) => yield Ok(StreamChunk::partial(text)),
                    Ok(DecodedEvent::FinalAnswer(answer)) => {
                        match persist_exchange(db.clone(), &request, answer).await {
                            Ok(done) => {
                                yield Ok(StreamChunk::done(format_chat_timestamp(done.ai_created_at)));
                            }
                            Err(e) => yield Err(e),
                        }
                        return;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Non-streaming exchange with a hard deadline on the upstream part.
    pub async fn send(&self, request: &ExchangeRequest) -> Result<CompletedExchange, ChatError> {
        let answer = match tokio::time::timeout(self.run_timeout, self.run_to_answer(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    elderly_id = %request.elderly_id,
                    timeout_secs = self.run_timeout.as_secs(),
                    "Run did not complete in time"
                );
                return Err(ChatError::UpstreamTimeout(format!(
                    "no completed answer within {}s",
                    self.run_timeout.as_secs()
                )));
            }
        };

        persist_exchange(self.db.clone(), request, answer).await
    }

    async fn run_to_answer(&self, request: &ExchangeRequest) -> Result<String, ChatError> {
        self.api
            .create_message(&request.thread, MessageRole::User, &request.content)
            .await?;
        let events = self
            .api
            .start_run(&request.thread, &request.assistant_id)
            .await?;
        EventStreamDecoder::final_answer(events).await
    }

    /// Non-streaming exchange followed by speech synthesis of the answer.
    ///
    /// The message pair is persisted before synthesis, so a synthesis
    /// failure still leaves the exchange recorded.
    pub async fn send_audio(
        &self,
        request: &ExchangeRequest,
        gender: Gender,
    ) -> Result<AudioAnswer, ChatError> {
        let exchange = self.send(request).await?;
        let voice = Voice::for_gender(gender);
        let audio = self
            .api
            .text_to_speech(voice, &exchange.answer)
            .await
            .map_err(|e| {
                warn!(elderly_id = %request.elderly_id, error = %e, "Speech synthesis failed");
                ChatError::UpstreamUnavailable(e.to_string())
            })?;

        Ok(AudioAnswer {
            audio,
            transcript: exchange.answer,
            timestamp: format_chat_timestamp(exchange.ai_created_at),
        })
    }
}

async fn persist_exchange(
    db: Arc<Database>,
    request: &ExchangeRequest,
    answer: String,
) -> Result<CompletedExchange, ChatError> {
    let user = Message::new(request.elderly_id, MessageType::User, request.content.clone());
    let ai = Message::new(request.elderly_id, MessageType::Ai, answer);
    let done = CompletedExchange {
        answer: ai.content.clone(),
        user_created_at: user.created_at,
        ai_created_at: ai.created_at,
    };

    tokio::task::spawn_blocking(move || MessageRepository::new(db).record_exchange(&user, &ai))
        .await??;

    info!(elderly_id = %request.elderly_id, "Exchange persisted");
    Ok(done)
}
