//! API error types and JSON error response formatting.
//!
//! ApiError maps domain and upstream failures onto HTTP status codes with a
//! consistent `{error, message}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use ieum_chat::ChatError;
use ieum_core::error::IeumError;
use ieum_insight::InsightError;

/// JSON error response body. Also the payload of the SSE `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "upstream_timeout").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - invalid request content.
    BadRequest(String),
    /// 403 - resource exists but does not belong to the caller's context.
    Forbidden(String),
    NotFound(String),
    /// 422 - nothing to work with (e.g., empty report window).
    UnprocessableEntity(String),
    Internal(String),
    /// 502 - the assistant answered with something unusable.
    BadGateway(String),
    /// 503 - the assistant could not be reached.
    ServiceUnavailable(String),
    /// 504 - the assistant did not answer in time.
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (code, message) = match self {
            ApiError::BadRequest(m) => ("bad_request", m),
            ApiError::Forbidden(m) => ("forbidden", m),
            ApiError::NotFound(m) => ("not_found", m),
            ApiError::UnprocessableEntity(m) => ("unprocessable_entity", m),
            ApiError::Internal(m) => ("internal_error", m),
            ApiError::BadGateway(m) => ("upstream_format", m),
            ApiError::ServiceUnavailable(m) => ("upstream_unavailable", m),
            ApiError::GatewayTimeout(m) => ("upstream_timeout", m),
        };
        ErrorBody {
            error: code.to_string(),
            message: message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::warn!(status = %self.status(), error = ?self, "Request failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let message = err.to_string();
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => ApiError::BadRequest(message),
            ChatError::NotFound(_) => ApiError::NotFound(message),
            ChatError::Forbidden(_) => ApiError::Forbidden(message),
            ChatError::UpstreamUnavailable(_) => ApiError::ServiceUnavailable(message),
            ChatError::UpstreamTimeout(_) => ApiError::GatewayTimeout(message),
            ChatError::UpstreamFormat(_) => ApiError::BadGateway(message),
            ChatError::Storage(_) => ApiError::Internal(message),
        }
    }
}

impl From<InsightError> for ApiError {
    fn from(err: InsightError) -> Self {
        let message = err.to_string();
        match err {
            InsightError::NotFound(_) => ApiError::NotFound(message),
            InsightError::InsufficientData(_) => ApiError::UnprocessableEntity(message),
            InsightError::UpstreamUnavailable(_) => ApiError::ServiceUnavailable(message),
            InsightError::UpstreamTimeout(_) => ApiError::GatewayTimeout(message),
            InsightError::UpstreamFormat(_) => ApiError::BadGateway(message),
            InsightError::Config(_) | InsightError::Storage(_) => ApiError::Internal(message),
        }
    }
}

impl From<IeumError> for ApiError {
    fn from(err: IeumError) -> Self {
        match &err {
            IeumError::NotFound(_) => ApiError::NotFound(err.to_string()),
            IeumError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {}", err))
    }
}
