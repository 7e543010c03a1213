//! JSON REST read API for Chirp.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`ContentStore`] and [`SessionStore`]. Everything here is read-only;
//! writes go through the realtime connection so they can be broadcast.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", chirp_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod posts;
pub mod users;

use std::sync::Arc;

use axum::{Router, routing::get};
use chirp_core::store::{ContentStore, SessionStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ContentStore + SessionStore + 'static,
{
  Router::new()
    // Posts
    .route("/posts", get(posts::list::<S>))
    .route("/posts/{id}", get(posts::get_one::<S>))
    // Users
    .route("/users/{username}", get(users::get_one::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
