//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use ieum_core::config::IeumConfig;
use ieum_core::error::IeumError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/elderlys/{id}/chat", post(handlers::chat))
        .route("/elderlys/{id}/chat/stream", post(handlers::chat_stream))
        .route("/elderlys/{id}/chat/audio", post(handlers::chat_audio))
        .route("/elderlys/{id}/messages", get(handlers::list_messages))
        .route("/reports/{id}", get(handlers::get_report))
        .route("/reports/{id}/analysis", post(handlers::analyze_report))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured port.
pub async fn start_server(config: &IeumConfig, state: AppState) -> Result<(), IeumError> {
    let addr = format!("0.0.0.0:{}", config.general.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IeumError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| IeumError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
