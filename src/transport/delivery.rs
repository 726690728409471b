use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::OutboundMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("transport connection closed")]
    Closed,
}

/// Where replies for a session are pushed.
///
/// `deliver` runs under the session lock, so it is synchronous and must not
/// block: hand the message to a queue or writer task and return.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryError>;
}

/// Sink feeding a connection's writer task
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        self.tx.send(message).map_err(|_| DeliveryError::Closed)
    }
}

/// Transport handle owned by a session: the sink plus the connection it belongs to
#[derive(Clone)]
pub struct Transport {
    connection_id: Uuid,
    sink: Arc<dyn OutputSink>,
}

impl Transport {
    pub fn new(connection_id: Uuid, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            connection_id,
            sink,
        }
    }

    /// Transport backed by an unbounded channel; returns the receiving end
    pub fn channel(connection_id: Uuid) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(connection_id, Arc::new(ChannelSink::new(tx))), rx)
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        self.sink.deliver(message)
    }
}
