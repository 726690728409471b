use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio::Utterance;
use crate::session::{Admission, Session, Turn};

use super::adapters::{AdapterError, Adapters};
use super::config::PipelineConfig;
use super::error::{ErrorClass, PipelineError};

/// Where a session's pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Transcribing,
    Generating,
    Synthesizing,
    Failed,
}

/// Result of one completed pipeline run
#[derive(Debug)]
pub enum TurnOutcome {
    /// Reply delivered and recorded in history
    Delivered(Turn),
    /// Transcript was empty; nothing recorded
    NoSpeech,
}

/// Runs STT → reply generation → TTS for utterances, one run per session at a time
pub struct Orchestrator {
    adapters: Adapters,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(adapters: Adapters, config: PipelineConfig) -> Self {
        Self { adapters, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Hand an utterance to the session's pipeline.
    ///
    /// Starts a run in the background when the session is idle; while a run
    /// is in flight the utterance is coalesced into the single pending slot.
    pub async fn run(self: &Arc<Self>, session: Arc<Session>, utterance: Utterance) {
        match session.admit(utterance).await {
            Admission::Start(utterance) => {
                let orchestrator = Arc::clone(self);
                tokio::spawn(async move {
                    orchestrator.drive(session, utterance).await;
                });
            }
            Admission::Coalesced { pending_bytes } => {
                debug!(
                    "Session {} busy, utterance coalesced ({} bytes pending)",
                    session.id(),
                    pending_bytes
                );
            }
            Admission::Closed => {
                debug!("Session {} closed, utterance discarded", session.id());
            }
        }
    }

    /// Run one utterance now and return its outcome to the caller.
    ///
    /// Takes the session's pipeline slot like a streamed utterance does, but
    /// fails with `Busy` instead of coalescing. Anything that was coalesced
    /// while this turn ran is driven in the background afterwards.
    pub async fn run_now(
        self: &Arc<Self>,
        session: Arc<Session>,
        utterance: Utterance,
    ) -> Result<TurnOutcome, PipelineError> {
        if !session.claim().await {
            return Err(PipelineError::Busy(session.id().to_string()));
        }

        let result = self.run_turn(&session, utterance).await;
        if result.is_err() {
            session.record_failure().await;
        }

        if let Some(next) = session.finish_run().await {
            let orchestrator = Arc::clone(self);
            tokio::spawn(async move {
                orchestrator.drive(session, next).await;
            });
        }

        result
    }

    /// Run turns until the pending slot is empty, then release the session
    async fn drive(&self, session: Arc<Session>, first: Utterance) {
        let mut next = Some(first);

        while let Some(utterance) = next.take() {
            match self.run_turn(&session, utterance).await {
                Ok(TurnOutcome::Delivered(turn)) => {
                    info!(
                        "Session {}: turn delivered ({} chars reply)",
                        session.id(),
                        turn.reply_text.len()
                    );
                }
                Ok(TurnOutcome::NoSpeech) => {
                    debug!("Session {}: no speech detected", session.id());
                }
                Err(e) => {
                    session.record_failure().await;
                    match e.class() {
                        ErrorClass::Discarded => debug!("Session {}: {}", session.id(), e),
                        ErrorClass::Transient => {
                            warn!("Session {}: turn abandoned: {}", session.id(), e)
                        }
                        ErrorClass::Permanent => {
                            warn!("Session {}: turn failed: {}", session.id(), e)
                        }
                    }
                }
            }

            next = session.finish_run().await;
        }
    }

    /// One full pass over an utterance
    pub async fn run_turn(
        &self,
        session: &Session,
        utterance: Utterance,
    ) -> Result<TurnOutcome, PipelineError> {
        let started_at = Utc::now();

        session.set_stage(PipelineStage::Transcribing).await;
        let transcript = self
            .call(
                session,
                PipelineStage::Transcribing,
                self.adapters.stt.transcribe(&utterance),
            )
            .await?;
        drop(utterance);

        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            return Ok(TurnOutcome::NoSpeech);
        }

        session.set_stage(PipelineStage::Generating).await;
        let history = session.history().await;
        let reply = self
            .call(
                session,
                PipelineStage::Generating,
                self.adapters.replier.generate_reply(&transcript, &history),
            )
            .await?;

        let reply_text = match reply.trim() {
            "" => self.config.fallback_reply.clone(),
            text => text.to_string(),
        };

        session.set_stage(PipelineStage::Synthesizing).await;
        let audio_ref = self
            .call(
                session,
                PipelineStage::Synthesizing,
                self.adapters.tts.synthesize(&reply_text),
            )
            .await?;

        let turn = Turn {
            transcript,
            reply_text,
            reply_audio_ref: Some(audio_ref),
            started_at,
            completed_at: Utc::now(),
        };

        session.complete_turn(turn.clone()).await?;

        Ok(TurnOutcome::Delivered(turn))
    }

    /// Await an adapter call under the session's cancellation token and the
    /// configured deadline.
    async fn call<T, F>(
        &self,
        session: &Session,
        stage: PipelineStage,
        call: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, AdapterError>>,
    {
        let token = session.cancellation();
        let deadline = self.config.adapter_timeout();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(PipelineError::Cancelled { stage }),
            result = tokio::time::timeout(deadline, call) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(PipelineError::Adapter { stage, source }),
                Err(_) => Err(PipelineError::Timeout { stage, after: deadline }),
            },
        }
    }
}
