//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/query/body via axum extractors, calls into the
//! chat or report services on AppState, and returns JSON (or SSE).

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use base64::{engine::general_purpose, Engine as _};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ieum_chat::{ChatAnswer, ChatRequest, StreamChunk};
use ieum_core::types::{Message, Report};
use ieum_storage::{ElderlyRepository, MessageRepository, ReportRepository};

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Default page size of the message history.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Largest accepted page size of the message history.
pub const MAX_PAGE_LIMIT: u32 = 100;

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MessagePageParams {
    /// Id of the oldest message already seen.
    pub cursor: Option<Uuid>,
    pub limit: Option<u32>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioResponse {
    /// Base64-encoded MP3.
    pub audio: String,
    pub transcript: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Cursor for the next (older) page; absent on the last page.
    pub next_cursor: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Chat
// =============================================================================

/// POST /elderlys/{id}/chat/stream - streaming chat over SSE.
///
/// Each answer chunk is a `chunk` event. An upstream failure after the
/// stream has started arrives as a final `error` event.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(elderly_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let chunks = state.chat.stream_chat(elderly_id, request).await?;

    let events = chunks.map(move |item| {
        let event = match item {
            Ok(chunk) => chunk_event(&chunk),
            Err(e) => {
                tracing::warn!(elderly_id = %elderly_id, error = %e, "Chat stream failed");
                error_event(&ApiError::from(e).body())
            }
        };
        Ok(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn chunk_event(chunk: &StreamChunk) -> Event {
    let data = serde_json::to_string(chunk).unwrap_or_default();
    Event::default().event("chunk").data(data)
}

fn error_event(body: &ErrorBody) -> Event {
    let data = serde_json::to_string(body).unwrap_or_default();
    Event::default().event("error").data(data)
}

/// POST /elderlys/{id}/chat - non-streaming chat.
pub async fn chat(
    State(state): State<AppState>,
    Path(elderly_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let answer = state.chat.send_chat(elderly_id, request).await?;
    Ok(Json(answer))
}

/// POST /elderlys/{id}/chat/audio - chat answered with synthesized speech.
pub async fn chat_audio(
    State(state): State<AppState>,
    Path(elderly_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AudioResponse>, ApiError> {
    let answer = state.chat.audio_chat(elderly_id, request).await?;
    Ok(Json(AudioResponse {
        audio: general_purpose::STANDARD.encode(&answer.audio),
        transcript: answer.transcript,
        timestamp: answer.timestamp,
    }))
}

/// GET /elderlys/{id}/messages - newest-first message history.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(elderly_id): Path<Uuid>,
    Query(params): Query<MessagePageParams>,
) -> Result<Json<MessagePage>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    let before = params.cursor;

    let db = state.database.clone();
    let messages = tokio::task::spawn_blocking(move || -> Result<Vec<Message>, ApiError> {
        if ElderlyRepository::new(db.clone()).find_by_id(elderly_id)?.is_none() {
            return Err(ApiError::NotFound(format!("elderly {}", elderly_id)));
        }
        Ok(MessageRepository::new(db).find_page(elderly_id, before, limit)?)
    })
    .await??;

    let next_cursor = if messages.len() == limit as usize {
        messages.last().map(|m| m.id)
    } else {
        None
    };

    Ok(Json(MessagePage {
        messages,
        next_cursor,
    }))
}

// =============================================================================
// Reports
// =============================================================================

/// POST /reports/{id}/analysis - analyze a pending report.
pub async fn analyze_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
    let report = state.reports.complete_report(report_id).await?;
    Ok(Json(report))
}

/// GET /reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
    let db = state.database.clone();
    let report = tokio::task::spawn_blocking(move || ReportRepository::new(db).find_by_id(report_id))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("report {}", report_id)))?;
    Ok(Json(report))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
