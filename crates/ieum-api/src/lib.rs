//! Ieum API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Exposes streaming, non-streaming and audio chat for elderly users,
//! report analysis, message history and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
