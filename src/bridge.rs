// Voice bridge: maps transport events onto session transitions
//
// start → get-or-create the session, bind the transport, start its ticker
// media → append to the session buffer, hand any flushed utterance to the pipeline
// stop  → remove the session (cancels in-flight work)

use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::{FlushReason, SegmentDecision, Segmenter, SegmenterConfig};
use crate::config::Config;
use crate::pipeline::{Adapters, Orchestrator, PipelineConfig};
use crate::session::{IngestError, Session, SessionConfig, SessionRegistry};
use crate::transport::{InboundEvent, Transport};

/// What a media chunk did to its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Buffered, no utterance boundary yet
    Buffered,
    /// Closed an utterance that went to the pipeline
    Flushed { bytes: usize, reason: FlushReason },
    /// Closed an utterance below the minimum floor; dropped
    Dropped { bytes: usize, reason: FlushReason },
}

/// What a dispatched event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Session opened (`created` is false when an open session was reused)
    Started { created: bool },
    Ingested(IngestOutcome),
    /// Chunk rejected and dropped
    Rejected(IngestError),
    /// Session torn down (`existed` is false for a repeated stop)
    Stopped { existed: bool },
}

/// Entry point shared by the WebSocket listener and the HTTP control plane
pub struct Bridge {
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<Orchestrator>,
    segmenter: Arc<Segmenter>,
}

impl Bridge {
    pub fn new(
        adapters: Adapters,
        segmenter: Segmenter,
        pipeline: PipelineConfig,
        defaults: SessionConfig,
    ) -> Self {
        let segmenter = Arc::new(segmenter);
        let registry = Arc::new(SessionRegistry::new(defaults, Arc::clone(&segmenter)));
        let orchestrator = Arc::new(Orchestrator::new(adapters, pipeline));

        Self {
            registry,
            orchestrator,
            segmenter,
        }
    }

    pub fn from_config(config: &Config, adapters: Adapters) -> Self {
        let defaults = SessionConfig {
            sample_rate: config.audio.sample_rate,
            history_window: config.pipeline.history_window,
        };

        Self::new(
            adapters,
            Segmenter::new(config.segmentation.clone()),
            config.pipeline.clone(),
            defaults,
        )
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn segmenter_config(&self) -> &SegmenterConfig {
        self.segmenter.config()
    }

    /// Apply one transport event
    pub async fn dispatch(&self, event: InboundEvent, transport: &Transport) -> Transition {
        match event {
            InboundEvent::Start {
                session_id,
                sample_rate,
            } => {
                let (_, created) = self
                    .start_session(&session_id, sample_rate, Some(transport.clone()))
                    .await;
                Transition::Started { created }
            }
            InboundEvent::Media {
                session_id,
                payload,
            } => match self.ingest(&session_id, payload).await {
                Ok(outcome) => Transition::Ingested(outcome),
                Err(e) => {
                    warn!("Dropping media chunk: {}", e);
                    Transition::Rejected(e)
                }
            },
            InboundEvent::Stop { session_id } => {
                let existed = self.stop_session(&session_id).await;
                Transition::Stopped { existed }
            }
        }
    }

    /// Register a session (idempotent) and optionally bind its transport
    pub async fn start_session(
        &self,
        id: &str,
        sample_rate: Option<u32>,
        transport: Option<Transport>,
    ) -> (Arc<Session>, bool) {
        loop {
            let (session, created) = self.registry.get_or_create(id, sample_rate);

            let open = match &transport {
                Some(transport) => session.attach_transport(transport.clone()).await,
                None => session.is_open().await,
            };

            if created {
                info!("Session started: {}", id);
                self.spawn_ticker(Arc::clone(&session));
            }

            // A session found closed was already unlinked from the registry,
            // so the next lookup creates a fresh one
            if open || created {
                return (session, created);
            }
            debug!("Session {} closed while starting, retrying", id);
        }
    }

    /// Append a chunk to a session; only `start` creates sessions
    pub async fn ingest(&self, id: &str, chunk: Vec<u8>) -> Result<IngestOutcome, IngestError> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| IngestError::SessionNotFound(id.to_string()))?;

        let decision = session.ingest(chunk, Instant::now()).await?;
        Ok(forward(&self.orchestrator, session, decision).await)
    }

    /// Tear a session down; returns whether it existed
    pub async fn stop_session(&self, id: &str) -> bool {
        let existed = self.registry.remove(id).await.is_some();
        if !existed {
            debug!("Stop for unknown session {} ignored", id);
        }
        existed
    }

    /// Release every session a closed connection still owns
    pub async fn disconnect(&self, connection_id: Uuid, session_ids: impl IntoIterator<Item = String>) {
        for id in session_ids {
            self.registry.release(&id, connection_id).await;
        }
    }

    /// Close every session (shutdown)
    pub async fn shutdown(&self) {
        info!("Closing {} open sessions", self.registry.len());
        self.registry.clear().await;
    }

    /// Re-evaluate the segmenter on an interval so the timeout rule fires
    /// without new audio. Stops when the session closes.
    fn spawn_ticker(&self, session: Arc<Session>) {
        let Some(period) = self.segmenter.tick_interval() else {
            return;
        };
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = session.cancellation().cancelled() => break,
                    _ = ticker.tick() => {
                        let decision = session.poll_segmenter(Instant::now()).await;
                        forward(&orchestrator, Arc::clone(&session), decision).await;
                    }
                }
            }

            debug!("Ticker stopped for session {}", session.id());
        });
    }
}

/// Hand a flushed utterance to the pipeline
async fn forward(
    orchestrator: &Arc<Orchestrator>,
    session: Arc<Session>,
    decision: SegmentDecision,
) -> IngestOutcome {
    match decision {
        SegmentDecision::Flush(utterance) => {
            let bytes = utterance.audio.len();
            let reason = utterance.reason;
            debug!(
                "Session {}: utterance of {} bytes ({:?})",
                session.id(),
                bytes,
                reason
            );
            orchestrator.run(session, utterance).await;
            IngestOutcome::Flushed { bytes, reason }
        }
        SegmentDecision::Dropped { bytes, reason } => IngestOutcome::Dropped { bytes, reason },
        SegmentDecision::Hold => IngestOutcome::Buffered,
    }
}
