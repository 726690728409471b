use serde::{Deserialize, Serialize};

use crate::pipeline::AudioRef;
use crate::session::Turn;

/// Event received from the transport for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        session_id: String,
        /// Sample rate of the media that follows; config default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_rate: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Media {
        session_id: String,
        /// Raw PCM, base64 on the wire
        #[serde(with = "base64_payload")]
        payload: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Stop { session_id: String },
}

impl InboundEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn session_id(&self) -> &str {
        match self {
            InboundEvent::Start { session_id, .. }
            | InboundEvent::Media { session_id, .. }
            | InboundEvent::Stop { session_id } => session_id,
        }
    }
}

/// Message pushed back over the connection that owns the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    Reply {
        session_id: String,
        transcript: String,
        text: String,
        audio_ref: Option<AudioRef>,
    },
}

impl OutboundMessage {
    pub fn reply(session_id: &str, turn: &Turn) -> Self {
        OutboundMessage::Reply {
            session_id: session_id.to_string(),
            transcript: turn.transcript.clone(),
            text: turn.reply_text.clone(),
            audio_ref: turn.reply_audio_ref.clone(),
        }
    }
}

mod base64_payload {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
