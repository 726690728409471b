//! Call session management
//!
//! This module provides the `Session` abstraction that owns:
//! - The transport handle used to push replies
//! - The audio ingest buffer and segmentation state
//! - Conversation history (bounded window of turns)
//! - The per-session pipeline slot (busy flag, pending utterance)
//!
//! `SessionRegistry` is the process-wide table of open sessions.

mod config;
mod registry;
mod session;
mod stats;

pub use config::SessionConfig;
pub use registry::SessionRegistry;
pub use session::{Admission, IngestError, Session, SessionState};
pub use stats::{SessionStats, Turn};
