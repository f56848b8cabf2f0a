use thiserror::Error;

/// Top-level error type for the Ieum backend.
///
/// Subsystem crates define their own error types (`LlmError`, `ChatError`,
/// `InsightError`) and convert from `IeumError` so that storage and
/// configuration failures propagate with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IeumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A caller-supplied value was rejected (e.g., an unknown page cursor).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for IeumError {
    fn from(err: toml::de::Error) -> Self {
        IeumError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for IeumError {
    fn from(err: toml::ser::Error) -> Self {
        IeumError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for IeumError {
    fn from(err: serde_json::Error) -> Self {
        IeumError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ieum operations.
pub type Result<T> = std::result::Result<T, IeumError>;
