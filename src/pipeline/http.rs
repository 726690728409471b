// HTTP adapters
//
// Generic request shapes for an upload-audio STT endpoint, an
// OpenAI-compatible chat-completions endpoint and a "speak" TTS endpoint.
// Anything vendor-specific beyond these shapes belongs in a custom adapter.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::audio::{encode_wav, Utterance};
use crate::config::{EndpointConfig, ReplyEndpointConfig};
use crate::session::Turn;

use super::adapters::{AdapterError, AudioRef, ReplyGenerator, SpeechToText, TextToSpeech};

fn with_auth(request: reqwest::RequestBuilder, endpoint: &EndpointConfig) -> reqwest::RequestBuilder {
    match (&endpoint.api_key, &endpoint.api_key_header) {
        (Some(key), Some(header)) => request.header(header.as_str(), key.as_str()),
        (Some(key), None) => request.bearer_auth(key),
        (None, _) => request,
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, AdapterError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| AdapterError::InvalidResponse(e.to_string()))
}

fn network(e: reqwest::Error) -> AdapterError {
    AdapterError::Network(e.to_string())
}

/// Uploads the utterance as a WAV body and reads `text` (or `transcript`)
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpTranscriber {
    pub fn new(client: reqwest::Client, endpoint: EndpointConfig) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl SpeechToText for HttpTranscriber {
    async fn transcribe(&self, utterance: &Utterance) -> Result<String, AdapterError> {
        let wav = encode_wav(&utterance.audio, utterance.sample_rate)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        let request = self
            .client
            .post(&self.endpoint.url)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav);

        let response = with_auth(request, &self.endpoint)
            .send()
            .await
            .map_err(network)?;
        let body = read_json(response).await?;

        let transcript = body
            .get("text")
            .or_else(|| body.get("transcript"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        debug!("Transcribed {} bytes: {:?}", utterance.audio.len(), transcript);

        Ok(transcript)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions
pub struct ChatReplyGenerator {
    client: reqwest::Client,
    endpoint: ReplyEndpointConfig,
}

impl ChatReplyGenerator {
    pub fn new(client: reqwest::Client, endpoint: ReplyEndpointConfig) -> Self {
        Self { client, endpoint }
    }

    fn messages(&self, transcript: &str, history: &[Turn]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(json!({ "role": "system", "content": self.endpoint.system_prompt }));

        for turn in history {
            messages.push(json!({ "role": "user", "content": turn.transcript }));
            messages.push(json!({ "role": "assistant", "content": turn.reply_text }));
        }

        messages.push(json!({ "role": "user", "content": transcript }));
        messages
    }
}

#[async_trait::async_trait]
impl ReplyGenerator for ChatReplyGenerator {
    async fn generate_reply(
        &self,
        transcript: &str,
        history: &[Turn],
    ) -> Result<String, AdapterError> {
        let payload = json!({
            "model": self.endpoint.model,
            "messages": self.messages(transcript, history),
        });

        let mut request = self.client.post(&self.endpoint.url).json(&payload);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(network)?;
        let body = read_json(response).await?;

        let completion: ChatCompletion = serde_json::from_value(body)
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }
}

/// Posts `{session_id?, text}` to a speak endpoint and returns the handle it
/// answers with
pub struct HttpSpeaker {
    client: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpSpeaker {
    pub fn new(client: reqwest::Client, endpoint: EndpointConfig) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl TextToSpeech for HttpSpeaker {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, AdapterError> {
        let mut payload = json!({ "text": text });
        if let Some(session_id) = &self.endpoint.session_id {
            payload["session_id"] = json!(session_id);
        }

        let request = self.client.post(&self.endpoint.url).json(&payload);

        let response = with_auth(request, &self.endpoint)
            .send()
            .await
            .map_err(network)?;
        let body = read_json(response).await?;

        // Speak APIs answer with a playable URL or an id for the queued task
        let data = body.get("data").unwrap_or(&body);
        ["audio_url", "url", "task_id", "id"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .map(AudioRef::new)
            .ok_or_else(|| AdapterError::InvalidResponse("no audio reference in response".to_string()))
    }
}
