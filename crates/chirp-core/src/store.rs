//! The `SessionStore` and `ContentStore` traits.
//!
//! The traits are implemented by storage backends (e.g. `chirp-store-sqlite`).
//! Higher layers (`chirp-hub`, `chirp-api`, `chirp-server`) depend on these
//! abstractions, never on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used from
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  content::{
    Comment, DirectMessage, NewComment, NewMessage, NewPost, NewVote, Poll, Post,
  },
  user::{NewUser, SessionId, User},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Which uniqueness constraint a rejected write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  Username,
  SessionId,
}

/// Bound on store error types. Backends report uniqueness violations through
/// [`StoreError::conflict`]; everything else is an opaque failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn conflict(&self) -> Option<Conflict> { None }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub trait SessionStore: Send + Sync {
  type Error: StoreError;

  /// Look up a user by session id. Returns `None` if not found.
  fn find_by_id(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user by exact username. Returns `None` if not found.
  fn find_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Persist a new user. Fails with a [`Conflict`] if the username or the
  /// session id is already taken; the existing account is left untouched.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// Durable feed content. Every write completes before the matching event is
/// broadcast, so a client reacting to an event can always read it back.
pub trait ContentStore: Send + Sync {
  type Error: StoreError;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Persist a post (and its poll, if any). `post_id` and `created_at` are
  /// assigned by the store.
  fn append_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// The `limit` most recent posts, newest first.
  fn recent_posts(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  // ── Reactions ─────────────────────────────────────────────────────────

  /// Record that `user_id` likes a post. A user's second like of the same
  /// post is ignored. Returns the post's like count, or `None` if the post
  /// does not exist.
  fn append_like(
    &self,
    post_id: Uuid,
    user_id: SessionId,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + '_;

  /// Returns `None` if the post does not exist.
  fn append_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Record a vote; a user's later votes on the same poll are ignored.
  /// Returns the poll's tally after the write, or `None` if the poll or the
  /// option does not exist (or the option belongs to another poll).
  fn append_vote(
    &self,
    input: NewVote,
  ) -> impl Future<Output = Result<Option<Poll>, Self::Error>> + Send + '_;

  // ── Direct messages ───────────────────────────────────────────────────

  fn append_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<DirectMessage, Self::Error>> + Send + '_;

  /// The latest `limit` messages sent or received by `user_id`, oldest
  /// first.
  fn messages_for(
    &self,
    user_id: SessionId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DirectMessage>, Self::Error>> + Send + '_;
}
