// Shared fakes for the integration tests
//
// The fake adapters record what they were called with and can be slowed
// down or made to fail, so pipeline ordering and isolation can be observed.

#![allow(dead_code)]

use loqa_voice::{
    AdapterError, Adapters, AudioRef, Bridge, PipelineConfig, ReplyGenerator, SegmenterConfig,
    Segmenter, Session, SessionConfig, SessionStats, SpeechToText, TextToSpeech, Turn, Utterance, VadConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum SttBehavior {
    /// "<first byte>:<length>"
    Describe,
    Fixed(String),
    Fail,
}

pub struct FakeStt {
    behavior: Mutex<SttBehavior>,
    delay: Duration,
    calls: Mutex<Vec<Vec<u8>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStt {
    pub fn new(behavior: SttBehavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: SttBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, utterance: &Utterance) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(utterance.audio.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            SttBehavior::Describe => Ok(format!(
                "{}:{}",
                utterance.audio.first().copied().unwrap_or_default(),
                utterance.audio.len()
            )),
            SttBehavior::Fixed(text) => Ok(text),
            SttBehavior::Fail => Err(AdapterError::Network("connection reset".to_string())),
        }
    }
}

pub struct FakeReplier {
    fixed: Option<String>,
    history_lens: Mutex<Vec<usize>>,
}

impl FakeReplier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fixed: None,
            history_lens: Mutex::new(Vec::new()),
        })
    }

    pub fn fixed(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            fixed: Some(reply.to_string()),
            history_lens: Mutex::new(Vec::new()),
        })
    }

    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReplyGenerator for FakeReplier {
    async fn generate_reply(
        &self,
        transcript: &str,
        history: &[Turn],
    ) -> Result<String, AdapterError> {
        self.history_lens.lock().unwrap().push(history.len());
        Ok(self
            .fixed
            .clone()
            .unwrap_or_else(|| format!("reply to {}", transcript)))
    }
}

pub struct FakeTts;

#[async_trait::async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, AdapterError> {
        Ok(AudioRef::new(format!("tts:{}", text.len())))
    }
}

pub fn adapters(stt: Arc<FakeStt>, replier: Arc<FakeReplier>) -> Adapters {
    Adapters::new(stt, replier, Arc::new(FakeTts))
}

/// Segmentation with only the threshold rule and no minimum floor
pub fn threshold_only(chunks: usize) -> SegmenterConfig {
    SegmenterConfig {
        chunk_threshold: chunks,
        silence_timeout_ms: 0,
        min_utterance_bytes: 1,
        tick_interval_ms: 100,
        vad: VadConfig::default(),
    }
}

pub fn bridge(adapters: Adapters, segmentation: SegmenterConfig, pipeline: PipelineConfig) -> Bridge {
    let defaults = SessionConfig {
        sample_rate: 8000,
        history_window: pipeline.history_window,
    };
    Bridge::new(adapters, Segmenter::new(segmentation), pipeline, defaults)
}

/// 16-bit mono PCM chunk filled with one byte value
pub fn chunk(fill: u8, len: usize) -> Vec<u8> {
    vec![fill; len]
}

/// Poll `check` until it holds, sleeping between attempts (about 5s of
/// virtual or real time).
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Like `eventually`, over a snapshot of the session's stats and history
pub async fn wait_session<F>(session: &Session, mut check: F) -> bool
where
    F: FnMut(&SessionStats, &[Turn]) -> bool,
{
    for _ in 0..500 {
        let stats = session.stats().await;
        let history = session.history().await;
        if check(&stats, &history) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
