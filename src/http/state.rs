use crate::bridge::Bridge;
use std::sync::Arc;

/// Shared application state for HTTP handlers and the WebSocket listener
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}
