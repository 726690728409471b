use super::state::AppState;
use crate::audio::{FlushReason, Utterance};
use crate::pipeline::{AudioRef, PipelineError, TurnOutcome};
use crate::session::{SessionStats, Turn};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Sample rate of the media stream (config default when absent)
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSessionResponse {
    pub session_id: String,
    pub created: bool,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

/// One turn run over posted audio
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTurnResponse {
    pub session_id: String,
    pub transcript: String,
    pub reply_text: String,
    pub audio_ref: Option<AudioRef>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn not_found(session_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session {} not found", session_id),
    )
}

fn pipeline_status(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::Busy(_) => StatusCode::CONFLICT,
        PipelineError::Cancelled { .. } | PipelineError::SessionClosed(_) => StatusCode::GONE,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Adapter { .. } | PipelineError::Delivery(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Register a session; an open session with the same ID is reused
pub async fn register_session(
    State(state): State<AppState>,
    body: Option<Json<RegisterSessionRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    let (session, created) = state
        .bridge
        .start_session(&session_id, req.sample_rate, None)
        .await;

    info!("Session registered over HTTP: {} (created: {})", session_id, created);

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(RegisterSessionResponse {
            session_id,
            created,
            stats: session.stats().await,
        }),
    )
        .into_response()
}

/// DELETE /sessions/:session_id
/// Tear a session down; unknown IDs are accepted
pub async fn teardown_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Tearing down session over HTTP: {}", session_id);
    state.bridge.stop_session(&session_id).await;
    StatusCode::NO_CONTENT
}

/// GET /sessions
/// List open session IDs
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let mut sessions = state.bridge.registry().ids();
    sessions.sort();
    (StatusCode::OK, Json(SessionListResponse { sessions }))
}

/// GET /sessions/:session_id
/// Get status of a session
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.bridge.registry().get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/history
/// Get the turns recorded so far
pub async fn get_session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.bridge.registry().get(&session_id) {
        Some(session) => {
            let history: Vec<Turn> = session.history().await;
            (StatusCode::OK, Json(history)).into_response()
        }
        None => not_found(&session_id),
    }
}

/// POST /sessions/:session_id/audio
/// Run one turn over a posted utterance (raw 16-bit mono PCM at the
/// session's sample rate) and answer with the result
pub async fn post_session_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No audio data received");
    }

    let Some(session) = state.bridge.registry().get(&session_id) else {
        return not_found(&session_id);
    };

    info!(
        "Received {} bytes of audio for session {}",
        body.len(),
        session_id
    );

    let utterance = Utterance {
        audio: body.to_vec(),
        sample_rate: session.sample_rate(),
        chunk_count: 1,
        reason: FlushReason::Upload,
    };

    // Detached, so a dropped request can't strand the session's pipeline slot
    let orchestrator = Arc::clone(state.bridge.orchestrator());
    let run = tokio::spawn(async move { orchestrator.run_now(session, utterance).await });

    match run.await {
        Ok(Ok(TurnOutcome::Delivered(turn))) => (
            StatusCode::OK,
            Json(AudioTurnResponse {
                session_id,
                transcript: turn.transcript,
                reply_text: turn.reply_text,
                audio_ref: turn.reply_audio_ref,
            }),
        )
            .into_response(),
        Ok(Ok(TurnOutcome::NoSpeech)) => {
            error_response(StatusCode::BAD_REQUEST, "No speech recognized in audio")
        }
        Ok(Err(e)) => {
            warn!("Audio turn for session {} failed: {}", session_id, e);
            error_response(pipeline_status(&e), e.to_string())
        }
        Err(e) => {
            error!("Audio turn task for session {} panicked: {}", session_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
