//! One module per family of client actions. Every content handler follows
//! the same order: validate, persist, then broadcast; nothing is announced
//! that a client could not read back from the store.

pub mod auth;
pub mod messages;
pub mod polls;
pub mod posts;
pub mod presence;
