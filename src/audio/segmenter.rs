// Utterance segmentation
//
// Decides from the buffered chunk stream when a spoken utterance is
// complete. Three rules are evaluated in a fixed order and the first one
// to trigger wins:
// - Threshold: chunk count since the last flush reached `chunk_threshold`
// - Timeout: no new audio for `silence_timeout_ms` while data is buffered
// - Voice boundary: voice was heard, then `vad.silence_ms` of silence

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::ingest::AudioBuffer;
use super::vad::{EnergyVad, VoiceActivityDetector};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Flush once this many chunks arrived since the last flush (0 disables)
    pub chunk_threshold: usize,
    /// Flush buffered audio after this much inactivity (0 disables)
    pub silence_timeout_ms: u64,
    /// Flushes smaller than this are dropped without running the pipeline
    pub min_utterance_bytes: usize,
    /// How often idle sessions re-check the timeout rule
    pub tick_interval_ms: u64,
    pub vad: VadConfig,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 15,
            silence_timeout_ms: 1500,
            min_utterance_bytes: 1600, // 100ms of 8kHz 16-bit mono
            tick_interval_ms: 100,
            vad: VadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub enabled: bool,
    /// Normalized RMS level (0.0 - 1.0) above which a chunk counts as voice
    pub energy_threshold: f32,
    /// Sustained silence after voice that closes an utterance
    pub silence_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            energy_threshold: 0.02,
            silence_ms: 700,
        }
    }
}

/// Which rule closed an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Threshold,
    Timeout,
    VoiceBoundary,
    /// Posted whole over the control plane, not cut from a stream
    Upload,
}

/// A finalized span of audio handed to the pipeline
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Ordered concatenation of the chunks received since the last flush
    pub audio: Vec<u8>,
    pub sample_rate: u32,
    pub chunk_count: usize,
    pub reason: FlushReason,
}

impl Utterance {
    /// Duration assuming 16-bit mono PCM
    pub fn duration_ms(&self) -> u64 {
        pcm_duration_ms(self.audio.len(), self.sample_rate)
    }

    /// Append a later utterance to this one, keeping chronological order
    pub fn merge(&mut self, later: Utterance) {
        self.audio.extend_from_slice(&later.audio);
        self.chunk_count += later.chunk_count;
        self.reason = later.reason;
    }
}

#[derive(Debug)]
pub enum SegmentDecision {
    Flush(Utterance),
    /// A rule fired but the buffered audio was below the minimum floor
    Dropped { bytes: usize, reason: FlushReason },
    Hold,
}

/// Per-session counters used by the segmenter; reset on every flush
#[derive(Debug, Default, Clone)]
pub struct SegmentationState {
    chunks_since_flush: usize,
    last_activity: Option<Instant>,
    heard_voice: bool,
    /// Samples of silence since voice was last heard
    silent_samples: u64,
    sample_rate: u32,
}

impl SegmentationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks_since_flush(&self) -> usize {
        self.chunks_since_flush
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Trailing silence after voice, converted once from the sample count
    pub fn silence_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.silent_samples * 1000 / self.sample_rate as u64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Segmentation policy shared by every session of a deployment
pub struct Segmenter {
    config: SegmenterConfig,
    vad: Option<Arc<dyn VoiceActivityDetector>>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        let vad: Option<Arc<dyn VoiceActivityDetector>> = if config.vad.enabled {
            Some(Arc::new(EnergyVad::new(config.vad.energy_threshold)))
        } else {
            None
        };

        Self { config, vad }
    }

    /// Use a custom voice-activity detector for the boundary rule
    pub fn with_vad(config: SegmenterConfig, vad: Arc<dyn VoiceActivityDetector>) -> Self {
        Self {
            config,
            vad: Some(vad),
        }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Interval at which idle sessions are re-evaluated, if the timeout rule is on
    pub fn tick_interval(&self) -> Option<Duration> {
        if self.config.silence_timeout_ms == 0 {
            return None;
        }
        Some(Duration::from_millis(self.config.tick_interval_ms.max(1)))
    }

    /// Record a chunk that was just appended to the buffer
    pub fn observe(
        &self,
        chunk: &[u8],
        sample_rate: u32,
        state: &mut SegmentationState,
        now: Instant,
    ) {
        state.chunks_since_flush += 1;
        state.last_activity = Some(now);
        state.sample_rate = sample_rate;

        if let Some(vad) = &self.vad {
            if vad.is_speech(chunk) {
                state.heard_voice = true;
                state.silent_samples = 0;
            } else if state.heard_voice {
                state.silent_samples += (chunk.len() / 2) as u64;
            }
        }
    }

    /// Which rule, if any, says the buffered audio is a complete utterance
    pub fn trigger(
        &self,
        buffer: &AudioBuffer,
        state: &SegmentationState,
        now: Instant,
    ) -> Option<FlushReason> {
        if buffer.is_empty() {
            return None;
        }

        if self.config.chunk_threshold > 0
            && state.chunks_since_flush >= self.config.chunk_threshold
        {
            return Some(FlushReason::Threshold);
        }

        if self.config.silence_timeout_ms > 0 {
            if let Some(last) = state.last_activity {
                let timeout = Duration::from_millis(self.config.silence_timeout_ms);
                if now.saturating_duration_since(last) >= timeout {
                    return Some(FlushReason::Timeout);
                }
            }
        }

        if self.vad.is_some()
            && state.heard_voice
            && state.silence_ms() >= self.config.vad.silence_ms
        {
            return Some(FlushReason::VoiceBoundary);
        }

        None
    }

    /// Evaluate the buffer; on flush the buffer is drained and the state reset
    /// before the utterance is returned to the caller.
    pub fn evaluate(
        &self,
        buffer: &mut AudioBuffer,
        state: &mut SegmentationState,
        sample_rate: u32,
        now: Instant,
    ) -> SegmentDecision {
        let Some(reason) = self.trigger(buffer, state, now) else {
            return SegmentDecision::Hold;
        };

        let chunk_count = buffer.chunk_count();
        let audio = buffer.take();
        state.reset();

        if audio.len() < self.config.min_utterance_bytes {
            debug!(
                "Dropping near-empty utterance ({} bytes < {} floor, {:?})",
                audio.len(),
                self.config.min_utterance_bytes,
                reason
            );
            return SegmentDecision::Dropped {
                bytes: audio.len(),
                reason,
            };
        }

        SegmentDecision::Flush(Utterance {
            audio,
            sample_rate,
            chunk_count,
            reason,
        })
    }
}

/// Duration of a 16-bit mono PCM span in milliseconds
pub(crate) fn pcm_duration_ms(bytes: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (bytes as u64 / 2) * 1000 / sample_rate as u64
}
