//! Transport Module
//!
//! Message channel to the paired watch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageSender                        │
//! │  (fire-and-forget send, outcome logging)                 │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ Transport::send(payload)
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌──────────────────┐       ┌────────────────┐
//! │ LocalSocket      │       │ Memory         │
//! │ Transport        │       │ Transport      │
//! │ - JSON lines     │       │ - in-process   │
//! │ - ack / nack     │       │ - tests        │
//! └────────┬─────────┘       └───────┬────────┘
//!          │  Ready / Inbound / Delivery events
//!          └──────────────┬──────────┘
//!                         ▼
//!                 BridgeEvent queue
//! ```
//!
//! ## Modules
//!
//! - [`wire`] - Frame format spoken over the local socket
//! - [`sender`] - Outbound adapter used by the bridge
//! - [`local_socket`] - Transport over an `interprocess` local socket
//! - [`memory`] - In-process transport

pub mod local_socket;
pub mod memory;
pub mod sender;
pub mod wire;

use crate::domain::models::{Payload, TransactionId};
use thiserror::Error;

pub use local_socket::LocalSocketTransport;
pub use memory::MemoryTransport;
pub use sender::MessageSender;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asynchronous, message-oriented channel to the peer.
///
/// `send` never blocks on delivery. Each send is eventually answered by a
/// `BridgeEvent::Delivery` carrying the returned id, and the transport also
/// emits `TransportReady` once the channel is up and `Inbound` for every peer
/// message.
pub trait Transport {
    fn send(&mut self, payload: Payload) -> TransactionId;
}
