//! Request and response shapes of the chat flows.

use serde::{Deserialize, Serialize};

/// Incoming chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    /// External id of the assistant the caller believes it is talking to.
    pub assistant_id: String,
}

impl ChatRequest {
    pub fn new(content: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            assistant_id: assistant_id.into(),
        }
    }
}

/// One outbound chunk of a streaming answer.
///
/// Partial chunks carry text and `done = false`. The terminal chunk has no
/// text, `done = true`, and the AI message's formatted creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub answer: Option<String>,
    pub done: bool,
    pub timestamp: Option<String>,
}

impl StreamChunk {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            done: false,
            timestamp: None,
        }
    }

    pub fn done(timestamp: impl Into<String>) -> Self {
        Self {
            answer: None,
            done: true,
            timestamp: Some(timestamp.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
}

/// Spoken answer: synthesized audio plus the text it was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAnswer {
    pub audio: Vec<u8>,
    pub transcript: String,
    pub timestamp: String,
}
