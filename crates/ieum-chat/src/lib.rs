//! Conversational exchange for Ieum.
//!
//! Decodes the assistant's run event stream, keeps each assistant's
//! conversation thread fresh, and persists every completed exchange as a
//! USER/AI message pair.

pub mod decoder;
pub mod error;
pub mod exchange;
pub mod service;
pub mod thread;
pub mod types;

pub use decoder::{DecodedEvent, EventStreamDecoder};
pub use error::ChatError;
pub use exchange::{ChatStream, CompletedExchange, ExchangeRequest, MessageExchangeCoordinator};
pub use service::ChatService;
pub use thread::{ThreadDecision, ThreadLifecycle};
pub use types::{AudioAnswer, ChatAnswer, ChatRequest, StreamChunk};
