use super::handlers;
use super::state::AppState;
use crate::transport::ws::ws_handler;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Largest utterance accepted by the audio route
const MAX_AUDIO_BODY: usize = 60 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route(
            "/sessions",
            post(handlers::register_session).get(handlers::list_sessions),
        )
        .route(
            "/sessions/:session_id",
            get(handlers::get_session_status).delete(handlers::teardown_session),
        )
        .route(
            "/sessions/:session_id/history",
            get(handlers::get_session_history),
        )
        // One-shot turn over posted audio
        .route(
            "/sessions/:session_id/audio",
            post(handlers::post_session_audio).layer(DefaultBodyLimit::max(MAX_AUDIO_BODY)),
        )
        // Media transport
        .route("/ws", get(ws_handler))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
