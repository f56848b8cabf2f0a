//! Conversation thread lifecycle.
//!
//! Each assistant owns at most one external thread. The first chat creates
//! it; a chat after `rotation_days` whole days of inactivity replaces it.
//! Replacing a thread orphans the external context only, never any stored
//! message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use ieum_core::types::Assistant;
use ieum_llm::AssistantApi;
use ieum_storage::{AssistantRepository, Database};

use crate::error::ChatError;

/// Outcome of the lifecycle check at the start of a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadDecision {
    /// No thread yet.
    Create,
    /// Thread went stale; a fresh one replaces it.
    Rotate { stale: String },
    Reuse(String),
}

pub struct ThreadLifecycle {
    api: Arc<dyn AssistantApi>,
    db: Arc<Database>,
    rotation_days: i64,
}

impl ThreadLifecycle {
    pub fn new(api: Arc<dyn AssistantApi>, db: Arc<Database>, rotation_days: i64) -> Self {
        Self {
            api,
            db,
            rotation_days,
        }
    }

    /// Pure transition rule.
    ///
    /// Rotation needs a stored handle, a known `last_chat_at`, and at least
    /// `rotation_days` whole days elapsed at `now`.
    pub fn decide(
        handle: Option<&str>,
        last_chat_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        rotation_days: i64,
    ) -> ThreadDecision {
        match (handle, last_chat_at) {
            (None, _) => ThreadDecision::Create,
            (Some(handle), Some(last)) if (now - last).num_days() >= rotation_days => {
                ThreadDecision::Rotate {
                    stale: handle.to_string(),
                }
            }
            (Some(handle), _) => ThreadDecision::Reuse(handle.to_string()),
        }
    }

    /// Return a usable thread handle for `assistant`, creating or rotating
    /// the external thread when needed. New handles are stored before
    /// returning.
    pub async fn ensure_thread(
        &self,
        assistant: &Assistant,
        last_chat_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<String, ChatError> {
        let decision = Self::decide(
            assistant.thread_handle.as_deref(),
            last_chat_at,
            now,
            self.rotation_days,
        );

        match decision {
            ThreadDecision::Reuse(handle) => Ok(handle),
            ThreadDecision::Create => {
                let handle = self.replace_thread(assistant).await?;
                info!(assistant_id = %assistant.id, thread = %handle, "Created conversation thread");
                Ok(handle)
            }
            ThreadDecision::Rotate { stale } => {
                let handle = self.replace_thread(assistant).await?;
                info!(
                    assistant_id = %assistant.id,
                    stale = %stale,
                    thread = %handle,
                    "Rotated inactive conversation thread"
                );
                Ok(handle)
            }
        }
    }

    async fn replace_thread(&self, assistant: &Assistant) -> Result<String, ChatError> {
        let handle = self.api.create_thread().await?;
        let db = self.db.clone();
        let assistant_id = assistant.id;
        let stored = handle.clone();
        tokio::task::spawn_blocking(move || {
            AssistantRepository::new(db).update_thread_handle(assistant_id, &stored)
        })
        .await??;
        Ok(handle)
    }
}
