//! The Assistants API port.
//!
//! Chat and report analysis only see this trait. `OpenAiAssistantClient`
//! implements it over HTTP, `MockAssistantApi` in memory.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use ieum_core::types::Gender;

use crate::error::LlmError;

/// One raw named server-sent event from a streaming run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub name: String,
    pub data: String,
}

impl RunEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Cold, single-subscriber stream of run events. Dropping it closes the
/// upstream connection.
pub type RunEventStream = Pin<Box<dyn Stream<Item = Result<RunEvent, LlmError>> + Send>>;

/// Acknowledgement of a message appended to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageAck {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Text-to-speech voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Nova,
    Onyx,
}

impl Voice {
    /// "nova" for female users, "onyx" otherwise.
    pub fn for_gender(gender: Gender) -> Self {
        match gender {
            Gender::Female => Voice::Nova,
            Gender::Male => Voice::Onyx,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Nova => "nova",
            Voice::Onyx => "onyx",
        }
    }
}

/// Operations consumed from the external assistant service.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Append a message to a thread.
    async fn create_message(
        &self,
        thread: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageAck, LlmError>;

    /// Start a streaming run of `assistant_id` on `thread`.
    async fn start_run(&self, thread: &str, assistant_id: &str)
        -> Result<RunEventStream, LlmError>;

    /// Create an empty thread and return its handle.
    async fn create_thread(&self) -> Result<String, LlmError>;

    /// Synthesize speech for `text`.
    async fn text_to_speech(&self, voice: Voice, text: &str) -> Result<Vec<u8>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_for_gender() {
        assert_eq!(Voice::for_gender(Gender::Female), Voice::Nova);
        assert_eq!(Voice::for_gender(Gender::Male), Voice::Onyx);
        assert_eq!(Voice::Nova.as_str(), "nova");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Voice::Onyx).unwrap(), "\"onyx\"");
    }
}
