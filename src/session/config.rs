use serde::{Deserialize, Serialize};

/// Per-session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sample rate of the incoming mono PCM (8kHz telephony, 16/24kHz realtime)
    pub sample_rate: u32,

    /// Maximum number of turns kept in history
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            history_window: 10,
        }
    }
}
