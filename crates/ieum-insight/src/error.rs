use thiserror::Error;

use ieum_chat::ChatError;
use ieum_core::error::IeumError;
use ieum_llm::LlmError;

/// Errors that can occur in the report analysis pipeline.
///
/// Any of these leaves the report PENDING.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("analysis service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("analysis service timed out: {0}")]
    UpstreamTimeout(String),
    #[error("unexpected analysis response: {0}")]
    UpstreamFormat(String),
}

impl From<IeumError> for InsightError {
    fn from(err: IeumError) -> Self {
        match err {
            IeumError::NotFound(what) => InsightError::NotFound(what),
            other => InsightError::Storage(other.to_string()),
        }
    }
}

impl From<LlmError> for InsightError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(msg) => InsightError::UpstreamTimeout(msg),
            LlmError::Format(msg) => InsightError::UpstreamFormat(msg),
            other => InsightError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<ChatError> for InsightError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::UpstreamTimeout(msg) => InsightError::UpstreamTimeout(msg),
            ChatError::UpstreamFormat(msg) => InsightError::UpstreamFormat(msg),
            ChatError::NotFound(what) => InsightError::NotFound(what),
            ChatError::Storage(msg) => InsightError::Storage(msg),
            other => InsightError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for InsightError {
    fn from(err: tokio::task::JoinError) -> Self {
        InsightError::Storage(format!("blocking task failed: {}", err))
    }
}
