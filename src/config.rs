use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::SegmenterConfig;
use crate::pipeline::PipelineConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub segmentation: SegmenterConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "loqa-voice".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Default sample rate for sessions that don't announce one
    /// (8kHz telephony, 16/24kHz realtime APIs)
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: 8000 }
    }
}

/// Which adapter family backs the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Local echo adapters, no network
    #[default]
    Echo,
    /// HTTP adapters configured below
    Http,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub kind: AdapterKind,
    #[serde(default)]
    pub stt: EndpointConfig,
    #[serde(default)]
    pub reply: ReplyEndpointConfig,
    #[serde(default)]
    pub tts: EndpointConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Header carrying the API key (e.g. "xi-api-key"); bearer auth when absent
    #[serde(default)]
    pub api_key_header: Option<String>,
    /// Upstream session the speak endpoint streams into (avatar/streaming TTS)
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEndpointConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ReplyEndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            model: default_model(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are a friendly voice assistant speaking naturally in conversation.".to_string()
}

impl Config {
    /// Load configuration from a file (any format the `config` crate knows)
    /// with `LOQA_VOICE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LOQA_VOICE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
