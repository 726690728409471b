pub mod audio;
pub mod bridge;
pub mod config;
pub mod http;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use audio::{
    AudioBuffer, EnergyVad, FlushReason, SegmentDecision, SegmentationState, Segmenter,
    SegmenterConfig, Utterance, VadConfig, VoiceActivityDetector,
};
pub use bridge::{Bridge, IngestOutcome, Transition};
pub use config::Config;
pub use http::{create_router, AppState};
pub use pipeline::{
    AdapterError, Adapters, AudioRef, ErrorClass, Orchestrator, PipelineConfig, PipelineError, PipelineStage,
    ReplyGenerator, SpeechToText, TextToSpeech, TurnOutcome,
};
pub use session::{
    Admission, IngestError, Session, SessionConfig, SessionRegistry, SessionState, SessionStats, Turn,
};
pub use transport::{InboundEvent, OutboundMessage, OutputSink, Transport};
