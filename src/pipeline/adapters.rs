use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::audio::Utterance;
use crate::config::{AdapterKind, AdaptersConfig};
use crate::session::Turn;

use super::echo::{EchoReplyGenerator, EchoSpeaker, EchoTranscriber};
use super::http::{ChatReplyGenerator, HttpSpeaker, HttpTranscriber};

/// Opaque handle to synthesized audio (URL, task id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(pub String);

impl AudioRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure reported by an external service adapter
#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by upstream service")]
    RateLimited,

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Adapter unavailable: {0}")]
    Unavailable(String),
}

impl AdapterError {
    /// Network errors, rate limits and 5xx responses may succeed on a later turn
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Network(_) | AdapterError::RateLimited => true,
            AdapterError::Status { status, .. } => *status >= 500,
            AdapterError::InvalidResponse(_) | AdapterError::Unavailable(_) => false,
        }
    }
}

/// Speech-to-text capability
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a finalized utterance; an empty string means no speech
    async fn transcribe(&self, utterance: &Utterance) -> Result<String, AdapterError>;
}

/// Reply generation capability (LLM)
#[async_trait::async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produce a reply to `transcript` given the bounded conversation window
    async fn generate_reply(&self, transcript: &str, history: &[Turn])
        -> Result<String, AdapterError>;
}

/// Text-to-speech capability
#[async_trait::async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, AdapterError>;
}

/// The three adapters one pipeline runs against
#[derive(Clone)]
pub struct Adapters {
    pub stt: Arc<dyn SpeechToText>,
    pub replier: Arc<dyn ReplyGenerator>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl Adapters {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        replier: Arc<dyn ReplyGenerator>,
        tts: Arc<dyn TextToSpeech>,
    ) -> Self {
        Self { stt, replier, tts }
    }

    /// Build the adapter set selected in configuration
    pub fn from_config(config: &AdaptersConfig) -> Result<Self> {
        match config.kind {
            AdapterKind::Echo => Ok(Self::new(
                Arc::new(EchoTranscriber),
                Arc::new(EchoReplyGenerator),
                Arc::new(EchoSpeaker),
            )),
            AdapterKind::Http => {
                if config.stt.url.is_empty() || config.reply.url.is_empty() || config.tts.url.is_empty()
                {
                    bail!("HTTP adapters need adapters.stt.url, adapters.reply.url and adapters.tts.url");
                }

                let client = reqwest::Client::new();
                Ok(Self::new(
                    Arc::new(HttpTranscriber::new(client.clone(), config.stt.clone())),
                    Arc::new(ChatReplyGenerator::new(client.clone(), config.reply.clone())),
                    Arc::new(HttpSpeaker::new(client, config.tts.clone())),
                ))
            }
        }
    }
}
