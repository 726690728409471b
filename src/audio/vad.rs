/// Voice activity detection over raw chunks (16-bit little-endian mono PCM)
pub trait VoiceActivityDetector: Send + Sync {
    /// Whether the chunk contains speech
    fn is_speech(&self, pcm: &[u8]) -> bool;
}

/// Energy-based detector: a chunk is voice when its normalized RMS level
/// reaches the threshold.
#[derive(Debug, Clone)]
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Normalized RMS level (0.0 - 1.0) of a PCM chunk
    pub fn rms(pcm: &[u8]) -> f32 {
        let mut sum = 0.0f64;
        let mut count = 0usize;

        for pair in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]) as f64 / i16::MAX as f64;
            sum += sample * sample;
            count += 1;
        }

        if count == 0 {
            return 0.0;
        }

        (sum / count as f64).sqrt() as f32
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn is_speech(&self, pcm: &[u8]) -> bool {
        Self::rms(pcm) >= self.threshold
    }
}
