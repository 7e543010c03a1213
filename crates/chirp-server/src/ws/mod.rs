//! WebSocket plumbing: one actor per connection, and the channel-backed
//! [`transport::ChannelTransport`] the hub delivers through.

pub mod actor;
pub mod transport;
