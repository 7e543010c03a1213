//! Core types and trait definitions for the Chirp realtime feed.
//!
//! This crate is deliberately free of HTTP, WebSocket and database
//! dependencies. Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod content;
pub mod error;
pub mod event;
pub mod protocol;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
