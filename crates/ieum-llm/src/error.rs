use thiserror::Error;

/// Errors raised while talking to the Assistants API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// Connection failure, reset, or broken event stream.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the upstream service.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Response body or event payload did not have the expected shape.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else if err.is_decode() {
            LlmError::Format(err.to_string())
        } else if let Some(status) = err.status() {
            LlmError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = LlmError::Http {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: overloaded");
        assert_eq!(
            LlmError::Network("reset".to_string()).to_string(),
            "Network error: reset"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err: LlmError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, LlmError::Format(_)));
    }
}
