use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::SessionConfig;
use super::stats::{SessionStats, Turn};
use crate::audio::{AudioBuffer, SegmentDecision, SegmentationState, Segmenter, Utterance};
use crate::pipeline::{PipelineError, PipelineStage};
use crate::transport::{OutboundMessage, Transport};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// Rejected audio append
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is no longer open")]
    SessionClosed(String),
}

/// What happened to an utterance offered to the pipeline slot
#[derive(Debug)]
pub enum Admission {
    /// Slot was free; the caller must run this utterance
    Start(Utterance),
    /// A run is in flight; the utterance joined the pending blob
    Coalesced { pending_bytes: usize },
    /// Session is closing; utterance discarded
    Closed,
}

struct SessionInner {
    state: SessionState,
    transport: Option<Transport>,
    buffer: AudioBuffer,
    segmentation: SegmentationState,
    history: VecDeque<Turn>,
    stage: PipelineStage,
    busy: bool,
    pending: Option<Utterance>,
}

/// A single call/meeting connection
pub struct Session {
    id: String,

    config: SessionConfig,

    segmenter: Arc<Segmenter>,

    /// When the session was registered
    created_at: DateTime<Utc>,

    /// Fired when the session closes; every adapter call races against it
    cancel: CancellationToken,

    inner: Mutex<SessionInner>,

    chunks_received: AtomicUsize,
    bytes_received: AtomicUsize,
    utterances_flushed: AtomicUsize,
    utterances_dropped: AtomicUsize,
    turns_completed: AtomicUsize,
    turns_failed: AtomicUsize,
}

impl Session {
    pub fn new(id: impl Into<String>, config: SessionConfig, segmenter: Arc<Segmenter>) -> Self {
        let id = id.into();
        info!(
            "Creating session: {} ({} Hz, history window {})",
            id, config.sample_rate, config.history_window
        );

        Self {
            id,
            config,
            segmenter,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                transport: None,
                buffer: AudioBuffer::new(),
                segmentation: SegmentationState::new(),
                history: VecDeque::new(),
                stage: PipelineStage::Idle,
                busy: false,
                pending: None,
            }),
            chunks_received: AtomicUsize::new(0),
            bytes_received: AtomicUsize::new(0),
            utterances_flushed: AtomicUsize::new(0),
            utterances_dropped: AtomicUsize::new(0),
            turns_completed: AtomicUsize::new(0),
            turns_failed: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn is_open(&self) -> bool {
        self.state().await == SessionState::Open
    }

    /// Bind the connection replies are pushed to, replacing any previous one.
    /// Returns false when the session is no longer open.
    pub async fn attach_transport(&self, transport: Transport) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open {
            return false;
        }
        debug!(
            "Session {} bound to connection {}",
            self.id,
            transport.connection_id()
        );
        inner.transport = Some(transport);
        true
    }

    /// Connection currently owning the transport handle
    pub async fn connection_id(&self) -> Option<Uuid> {
        self.inner
            .lock()
            .await
            .transport
            .as_ref()
            .map(Transport::connection_id)
    }

    /// Append a chunk and run the segmenter over the updated buffer
    pub async fn ingest(&self, chunk: Vec<u8>, now: Instant) -> Result<SegmentDecision, IngestError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open {
            return Err(IngestError::SessionClosed(self.id.clone()));
        }

        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(chunk.len(), Ordering::Relaxed);

        let SessionInner {
            buffer,
            segmentation,
            ..
        } = &mut *inner;

        self.segmenter
            .observe(&chunk, self.config.sample_rate, segmentation, now);
        buffer.push(chunk);

        let decision = self
            .segmenter
            .evaluate(buffer, segmentation, self.config.sample_rate, now);
        self.count_decision(&decision);

        Ok(decision)
    }

    /// Re-evaluate the segmenter without new audio (timeout rule)
    pub async fn poll_segmenter(&self, now: Instant) -> SegmentDecision {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open {
            return SegmentDecision::Hold;
        }

        let SessionInner {
            buffer,
            segmentation,
            ..
        } = &mut *inner;

        let decision = self
            .segmenter
            .evaluate(buffer, segmentation, self.config.sample_rate, now);
        self.count_decision(&decision);

        decision
    }

    fn count_decision(&self, decision: &SegmentDecision) {
        match decision {
            SegmentDecision::Flush(_) => {
                self.utterances_flushed.fetch_add(1, Ordering::Relaxed);
            }
            SegmentDecision::Dropped { .. } => {
                self.utterances_dropped.fetch_add(1, Ordering::Relaxed);
            }
            SegmentDecision::Hold => {}
        }
    }

    /// Offer an utterance to the pipeline slot.
    ///
    /// At most one run is in flight; while busy, later utterances are
    /// concatenated into a single pending blob.
    pub async fn admit(&self, utterance: Utterance) -> Admission {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open {
            return Admission::Closed;
        }

        if !inner.busy {
            inner.busy = true;
            return Admission::Start(utterance);
        }

        let pending_bytes = match inner.pending.as_mut() {
            Some(pending) => {
                pending.merge(utterance);
                pending.audio.len()
            }
            None => {
                let bytes = utterance.audio.len();
                inner.pending = Some(utterance);
                bytes
            }
        };

        Admission::Coalesced { pending_bytes }
    }

    /// Take the pipeline slot for a run that must not be coalesced.
    /// Returns false when a run is already in flight or the session is closed.
    pub async fn claim(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open || inner.busy {
            return false;
        }
        inner.busy = true;
        true
    }

    /// End the current run; returns the pending utterance to run next, or
    /// releases the slot.
    pub async fn finish_run(&self) -> Option<Utterance> {
        let mut inner = self.inner.lock().await;

        if inner.state == SessionState::Open {
            if let Some(next) = inner.pending.take() {
                return Some(next);
            }
        } else {
            inner.pending = None;
        }

        inner.busy = false;
        inner.stage = PipelineStage::Idle;
        None
    }

    pub async fn set_stage(&self, stage: PipelineStage) {
        self.inner.lock().await.stage = stage;
    }

    pub async fn stage(&self) -> PipelineStage {
        self.inner.lock().await.stage
    }

    pub async fn is_pipeline_busy(&self) -> bool {
        self.inner.lock().await.busy
    }

    pub async fn record_failure(&self) {
        self.turns_failed.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().await.stage = PipelineStage::Failed;
    }

    /// Deliver a finished turn and record it in history.
    ///
    /// Both happen under the session lock, so nothing reaches the transport
    /// once `close` has run.
    pub async fn complete_turn(&self, turn: Turn) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open || self.cancel.is_cancelled() {
            return Err(PipelineError::SessionClosed(self.id.clone()));
        }

        if let Some(transport) = &inner.transport {
            let message = OutboundMessage::reply(&self.id, &turn);
            transport.deliver(message)?;
        } else {
            debug!("Session {} has no transport bound, reply not pushed", self.id);
        }

        inner.history.push_back(turn);
        while inner.history.len() > self.config.history_window {
            inner.history.pop_front();
        }

        self.turns_completed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Recorded turns, oldest first
    pub async fn history(&self) -> Vec<Turn> {
        self.inner.lock().await.history.iter().cloned().collect()
    }

    /// Close the session: cancel in-flight work, drop buffered audio and the
    /// transport handle. Closing twice is a no-op.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        self.shut(&mut inner);
    }

    /// Close the session if `connection_id` still owns its transport.
    ///
    /// The binding is checked and `unlink` runs under the session lock, so a
    /// concurrent `attach_transport` either lands first (and the session is
    /// kept) or finds the session closed. `unlink` returns whether the
    /// session was taken out of its registry.
    pub async fn close_if_bound<F>(&self, connection_id: Uuid, unlink: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Open {
            return false;
        }

        let bound = inner.transport.as_ref().map(Transport::connection_id);
        if bound.is_some() && bound != Some(connection_id) {
            debug!(
                "Session {} now bound to another connection, not releasing",
                self.id
            );
            return false;
        }

        if !unlink() {
            return false;
        }

        self.shut(&mut inner);
        true
    }

    fn shut(&self, inner: &mut SessionInner) {
        if inner.state == SessionState::Closed {
            return;
        }

        info!("Closing session: {}", self.id);
        inner.state = SessionState::Closing;
        self.cancel.cancel();

        inner.buffer.clear();
        inner.segmentation.reset();
        inner.pending = None;
        inner.transport = None;
        inner.state = SessionState::Closed;
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let inner = self.inner.lock().await;
        let duration = Utc::now().signed_duration_since(self.created_at);

        SessionStats {
            session_id: self.id.clone(),
            state: inner.state,
            sample_rate: self.config.sample_rate,
            created_at: self.created_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            pipeline_busy: inner.busy,
            stage: inner.stage,
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            utterances_flushed: self.utterances_flushed.load(Ordering::Relaxed),
            utterances_dropped: self.utterances_dropped.load(Ordering::Relaxed),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            history_len: inner.history.len(),
        }
    }
}
