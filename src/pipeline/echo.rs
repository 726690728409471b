// Offline adapters for local development: no network, deterministic output.

use crate::audio::Utterance;
use crate::session::Turn;

use super::adapters::{AdapterError, AudioRef, ReplyGenerator, SpeechToText, TextToSpeech};

/// Reports the utterance length instead of real words
pub struct EchoTranscriber;

#[async_trait::async_trait]
impl SpeechToText for EchoTranscriber {
    async fn transcribe(&self, utterance: &Utterance) -> Result<String, AdapterError> {
        Ok(format!(
            "{} ms of audio ({} chunks)",
            utterance.duration_ms(),
            utterance.chunk_count
        ))
    }
}

pub struct EchoReplyGenerator;

#[async_trait::async_trait]
impl ReplyGenerator for EchoReplyGenerator {
    async fn generate_reply(
        &self,
        transcript: &str,
        history: &[Turn],
    ) -> Result<String, AdapterError> {
        Ok(format!("You said: {} (turn {})", transcript, history.len() + 1))
    }
}

pub struct EchoSpeaker;

#[async_trait::async_trait]
impl TextToSpeech for EchoSpeaker {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, AdapterError> {
        Ok(AudioRef::new(format!("echo:{}", text.len())))
    }
}
