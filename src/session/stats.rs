use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionState;
use crate::pipeline::{AudioRef, PipelineStage};

/// Statistics about a call session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    pub sample_rate: u32,

    /// When the session was registered
    pub created_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Whether a pipeline run is in flight
    pub pipeline_busy: bool,

    pub stage: PipelineStage,

    pub chunks_received: usize,

    pub bytes_received: usize,

    /// Utterances handed to the pipeline
    pub utterances_flushed: usize,

    /// Flushes below the minimum-bytes floor
    pub utterances_dropped: usize,

    pub turns_completed: usize,

    pub turns_failed: usize,

    /// Turns currently held in history
    pub history_len: usize,
}

/// One request/response exchange recorded in a session's history.
///
/// The utterance audio itself is never stored; it is dropped once
/// transcription finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// What the caller said
    pub transcript: String,

    /// What was answered
    pub reply_text: String,

    /// Handle to the synthesized reply, if any
    pub reply_audio_ref: Option<AudioRef>,

    /// When the pipeline picked up the utterance
    pub started_at: DateTime<Utc>,

    /// When the reply was delivered
    pub completed_at: DateTime<Utc>,
}
