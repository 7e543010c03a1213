//! The realtime core of Chirp: who is connected, as whom, and who gets which
//! event.
//!
//! - [`registry`]: the connection ↔ user index.
//! - [`hub`]: owns the registry and a [`Transport`], and fans events out.
//! - [`handshake`]: the per-connection authentication state machine that
//!   ends in a registry bind.
//!
//! Nothing here knows about WebSockets or SQL; the server crate supplies a
//! transport and the store crates supply the backends.

pub mod error;
pub mod handshake;
pub mod hub;
pub mod registry;
pub mod session_id;

pub use error::{Error, Result};
pub use hub::{Delivery, Hub, Transport};
pub use registry::{Binding, ConnectionId, Registry};
