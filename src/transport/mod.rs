//! Duplex transport to the telephony/meeting side
//!
//! - `messages`: logical inbound events and outbound replies
//! - `delivery`: the transport handle a session pushes replies through
//! - `ws`: WebSocket listener, one task per connection

mod delivery;
pub mod messages;
pub mod ws;

pub use delivery::{ChannelSink, DeliveryError, OutputSink, Transport};
pub use messages::{InboundEvent, OutboundMessage};
