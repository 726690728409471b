//! HTTP control plane
//!
//! This module provides a REST API for managing call sessions:
//! - POST /sessions - Register a session
//! - DELETE /sessions/:id - Tear a session down
//! - GET /sessions - List open sessions
//! - GET /sessions/:id - Query session status
//! - GET /sessions/:id/history - Get recorded turns
//! - POST /sessions/:id/audio - Run one turn over posted audio
//! - GET /ws - Media-stream WebSocket
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
