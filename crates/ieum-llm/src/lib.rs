//! Ieum LLM crate - the Assistants API port used by chat and report
//! analysis, its HTTP implementation and a scripted in-memory mock.

pub mod api;
pub mod client;
pub mod error;
pub mod mock;

pub use api::{AssistantApi, MessageAck, MessageRole, RunEvent, RunEventStream, Voice};
pub use client::OpenAiAssistantClient;
pub use error::LlmError;
pub use mock::MockAssistantApi;
