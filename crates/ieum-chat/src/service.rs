//! Chat entry flow.
//!
//! Validates the request, resolves the elderly user and their assistant,
//! runs the thread lifecycle check, then hands off to the exchange
//! coordinator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use ieum_core::config::ChatConfig;
use ieum_core::types::{now_millis, Assistant, Elderly};
use ieum_llm::AssistantApi;
use ieum_storage::{AssistantRepository, Database, ElderlyRepository};

use crate::error::ChatError;
use crate::exchange::{ChatStream, ExchangeRequest, MessageExchangeCoordinator};
use crate::thread::ThreadLifecycle;
use crate::types::{AudioAnswer, ChatAnswer, ChatRequest};

struct ResolvedChat {
    elderly: Elderly,
    exchange: ExchangeRequest,
}

pub struct ChatService {
    db: Arc<Database>,
    lifecycle: ThreadLifecycle,
    coordinator: MessageExchangeCoordinator,
    max_message_length: usize,
}

impl ChatService {
    pub fn new(api: Arc<dyn AssistantApi>, db: Arc<Database>, config: &ChatConfig) -> Self {
        Self {
            lifecycle: ThreadLifecycle::new(api.clone(), db.clone(), config.thread_rotation_days),
            coordinator: MessageExchangeCoordinator::new(
                api,
                db.clone(),
                Duration::from_secs(config.run_timeout_secs),
            ),
            db,
            max_message_length: config.max_message_length,
        }
    }

    /// Streaming chat. Entry validation errors are returned directly;
    /// upstream errors arrive as the last stream item.
    pub async fn stream_chat(
        &self,
        elderly_id: Uuid,
        request: ChatRequest,
    ) -> Result<ChatStream, ChatError> {
        let resolved = self.resolve(elderly_id, request).await?;
        Ok(self.coordinator.stream(resolved.exchange))
    }

    pub async fn send_chat(
        &self,
        elderly_id: Uuid,
        request: ChatRequest,
    ) -> Result<ChatAnswer, ChatError> {
        let resolved = self.resolve(elderly_id, request).await?;
        let done = self.coordinator.send(&resolved.exchange).await?;
        Ok(ChatAnswer {
            answer: done.answer,
        })
    }

    pub async fn audio_chat(
        &self,
        elderly_id: Uuid,
        request: ChatRequest,
    ) -> Result<AudioAnswer, ChatError> {
        let resolved = self.resolve(elderly_id, request).await?;
        self.coordinator
            .send_audio(&resolved.exchange, resolved.elderly.gender)
            .await
    }

    fn validate(&self, request: &ChatRequest) -> Result<(), ChatError> {
        if request.content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if request.content.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        Ok(())
    }

    async fn resolve(
        &self,
        elderly_id: Uuid,
        request: ChatRequest,
    ) -> Result<ResolvedChat, ChatError> {
        self.validate(&request)?;

        let (elderly, assistant) = self.load_participants(elderly_id).await?;

        if assistant.external_assistant_id != request.assistant_id {
            warn!(
                elderly_id = %elderly_id,
                requested = %request.assistant_id,
                "Assistant id does not match the elderly's assistant"
            );
            return Err(ChatError::Forbidden(format!(
                "assistant {} does not belong to elderly {}",
                request.assistant_id, elderly_id
            )));
        }

        let thread = self
            .lifecycle
            .ensure_thread(&assistant, elderly.last_chat_at, now_millis())
            .await?;
        debug!(elderly_id = %elderly_id, thread = %thread, "Chat resolved");

        Ok(ResolvedChat {
            exchange: ExchangeRequest {
                elderly_id,
                thread,
                content: request.content,
                assistant_id: assistant.external_assistant_id,
            },
            elderly,
        })
    }

    async fn load_participants(&self, elderly_id: Uuid) -> Result<(Elderly, Assistant), ChatError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<(Elderly, Assistant), ChatError> {
            let elderly = ElderlyRepository::new(db.clone())
                .find_by_id(elderly_id)?
                .ok_or_else(|| ChatError::NotFound(format!("elderly {}", elderly_id)))?;
            let assistant_id = elderly.assistant_id.ok_or_else(|| {
                ChatError::NotFound(format!("assistant for elderly {}", elderly_id))
            })?;
            let assistant = AssistantRepository::new(db)
                .find_by_id(assistant_id)?
                .ok_or_else(|| ChatError::NotFound(format!("assistant {}", assistant_id)))?;
            Ok((elderly, assistant))
        })
        .await?
    }
}
