// WebSocket transport listener
//
// One task per connection reads frames and dispatches them; a writer task
// drains the connection's outbound channel. When the socket closes, every
// session the connection still owns is released.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::delivery::Transport;
use super::messages::InboundEvent;
use crate::bridge::Bridge;
use crate::http::AppState;

/// GET /ws
/// Upgrade to a media-stream connection
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.bridge))
}

/// Sessions started over one connection, in start order
#[derive(Debug, Default)]
pub struct ConnectionSessions {
    owned: HashSet<String>,
    current: Option<String>,
}

impl ConnectionSessions {
    /// Track start/stop events; binary frames go to the latest started session
    pub fn track(&mut self, event: &InboundEvent) {
        match event {
            InboundEvent::Start { session_id, .. } => {
                self.owned.insert(session_id.clone());
                self.current = Some(session_id.clone());
            }
            InboundEvent::Stop { session_id } => {
                self.owned.remove(session_id);
                if self.current.as_deref() == Some(session_id.as_str()) {
                    self.current = None;
                }
            }
            InboundEvent::Media { .. } => {}
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn into_owned(self) -> Vec<String> {
        self.owned.into_iter().collect()
    }
}

async fn handle_socket(socket: WebSocket, bridge: Arc<Bridge>) {
    let connection_id = Uuid::new_v4();
    info!("Transport connection opened: {}", connection_id);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (transport, mut outbound_rx) = Transport::channel(connection_id);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };

            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut sessions = ConnectionSessions::default();

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => match InboundEvent::parse(&text) {
                Ok(event) => {
                    sessions.track(&event);
                    let transition = bridge.dispatch(event, &transport).await;
                    debug!("Connection {}: {:?}", connection_id, transition);
                }
                Err(e) => {
                    warn!("Ignoring malformed control message: {}", e);
                }
            },
            Ok(Message::Binary(payload)) => match sessions.current() {
                Some(session_id) => {
                    let event = InboundEvent::Media {
                        session_id: session_id.to_string(),
                        payload,
                    };
                    bridge.dispatch(event, &transport).await;
                }
                None => warn!("Binary media before start on connection {}", connection_id),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Transport connection {} failed: {}", connection_id, e);
                break;
            }
        }
    }

    bridge.disconnect(connection_id, sessions.into_owned()).await;
    writer.abort();

    info!("Transport connection closed: {}", connection_id);
}
