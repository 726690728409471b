//! Speech-to-text → reply generation → text-to-speech chain
//!
//! - `adapters`: capability traits for the external services
//! - `orchestrator`: per-session serialized pipeline runs
//! - `echo` / `http`: shipped adapter implementations

pub mod adapters;
mod config;
pub mod echo;
mod error;
pub mod http;
mod orchestrator;

pub use adapters::{Adapters, AdapterError, AudioRef, ReplyGenerator, SpeechToText, TextToSpeech};
pub use config::PipelineConfig;
pub use error::{ErrorClass, PipelineError};
pub use orchestrator::{Orchestrator, PipelineStage, TurnOutcome};
