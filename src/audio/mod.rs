pub mod ingest;
pub mod segmenter;
pub mod vad;
pub mod wav;

pub use ingest::AudioBuffer;
pub use segmenter::{
    FlushReason, SegmentDecision, SegmentationState, Segmenter, SegmenterConfig, Utterance,
    VadConfig,
};
pub use vad::{EnergyVad, VoiceActivityDetector};
pub use wav::encode_wav;
