use serde::Deserialize;
use std::time::Duration;

/// Configuration for pipeline runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard deadline for each adapter call
    /// Default: 15000 ms
    pub adapter_timeout_ms: u64,

    /// Number of turns kept per session and passed to reply generation
    pub history_window: usize,

    /// Spoken when the reply generator returns nothing
    pub fallback_reply: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: 15_000,
            history_window: 10,
            fallback_reply: "Sorry, I didn't catch that. Could you say it again?".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }
}
