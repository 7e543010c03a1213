//! Error type for `chirp-hub`. Every variant is scoped to the single
//! connection that caused it.

use chirp_core::{protocol::ErrorCode, store::StoreError};
use thiserror::Error;

use crate::registry::ConnectionId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("connection {0} is already bound to another user")]
  AlreadyBound(ConnectionId),

  #[error("this connection is already authenticated")]
  AlreadyAuthenticated,

  #[error("invalid session id")]
  AuthFailed,

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("could not allocate a unique session id, please try again")]
  SessionIdExhausted,

  #[error("not authenticated")]
  NotAuthenticated,

  #[error(transparent)]
  Invalid(#[from] chirp_core::Error),

  #[error("{0} not found")]
  NotFound(&'static str),

  /// The wrapped error is logged, never shown to clients.
  #[error("store unavailable")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E: StoreError>(e: E) -> Self { Self::StoreUnavailable(Box::new(e)) }

  /// The category reported on the wire.
  pub fn code(&self) -> ErrorCode {
    match self {
      Error::AuthFailed => ErrorCode::AuthError,
      Error::AlreadyBound(_) | Error::AlreadyAuthenticated => {
        ErrorCode::AlreadyAuthenticated
      }
      Error::UsernameTaken(_) => ErrorCode::UsernameTaken,
      Error::SessionIdExhausted => ErrorCode::SessionIdExhausted,
      Error::NotAuthenticated => ErrorCode::NotAuthenticated,
      Error::Invalid(_) => ErrorCode::InvalidInput,
      Error::NotFound(_) => ErrorCode::NotFound,
      Error::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
    }
  }

  /// Whether repeating the same request may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::SessionIdExhausted | Error::StoreUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
