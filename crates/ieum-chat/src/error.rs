//! Error types for the conversational exchange.

use ieum_core::error::IeumError;
use ieum_llm::LlmError;

/// Errors from the chat entry flow and message exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("assistant service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("assistant service timed out: {0}")]
    UpstreamTimeout(String),
    #[error("unexpected assistant response: {0}")]
    UpstreamFormat(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<IeumError> for ChatError {
    fn from(err: IeumError) -> Self {
        match err {
            IeumError::NotFound(what) => ChatError::NotFound(what),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(msg) => ChatError::UpstreamTimeout(msg),
            LlmError::Format(msg) => ChatError::UpstreamFormat(msg),
            other => ChatError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChatError::Storage(format!("blocking task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::UpstreamFormat("no content in completed event".to_string()).to_string(),
            "unexpected assistant response: no content in completed event"
        );
    }

    #[test]
    fn test_from_ieum_error_keeps_not_found() {
        let err: ChatError = IeumError::NotFound("elderly 1".to_string()).into();
        assert!(matches!(err, ChatError::NotFound(ref s) if s == "elderly 1"));

        let err: ChatError = IeumError::Storage("disk full".to_string()).into();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_llm_error_taxonomy() {
        let err: ChatError = LlmError::Timeout("30s".to_string()).into();
        assert!(matches!(err, ChatError::UpstreamTimeout(_)));

        let err: ChatError = LlmError::Format("bad json".to_string()).into();
        assert!(matches!(err, ChatError::UpstreamFormat(_)));

        let err: ChatError = LlmError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        }
        .into();
        assert!(matches!(err, ChatError::UpstreamUnavailable(_)));

        let err: ChatError = LlmError::Network("reset".to_string()).into();
        assert!(matches!(err, ChatError::UpstreamUnavailable(_)));
    }
}
