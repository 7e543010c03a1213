//! [`ChannelTransport`]: the hub's [`Transport`] for WebSocket connections.
//!
//! Each connection owns the receiving half of an unbounded channel, drained
//! by its writer task. Sending never awaits, so a slow socket can only grow
//! its own queue; it never holds up a broadcast.

use chirp_core::protocol::ServerEvent;
use chirp_hub::{ConnectionId, Transport};
use dashmap::DashMap;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

#[derive(Default)]
pub struct ChannelTransport {
  senders: DashMap<ConnectionId, EventSender>,
}

impl ChannelTransport {
  /// Create the outbound queue for `connection`. Must happen before the
  /// connection is opened on the hub so no broadcast can miss the sink.
  pub fn attach(&self, connection: ConnectionId) -> EventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    self.senders.insert(connection, tx);
    rx
  }

  pub fn detach(&self, connection: ConnectionId) { self.senders.remove(&connection); }

  pub fn len(&self) -> usize { self.senders.len() }

  pub fn is_empty(&self) -> bool { self.senders.is_empty() }
}

impl Transport for ChannelTransport {
  fn send(&self, connection: ConnectionId, event: ServerEvent) -> bool {
    match self.senders.get(&connection) {
      Some(tx) => tx.send(event).is_ok(),
      None => false,
    }
  }
}
