//! Errors raised while handling one client frame, and how each is reported
//! back to that connection.

use chirp_core::{
  protocol::{ErrorCode, Reply},
  store::StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed message: {0}")]
  Decode(#[from] serde_json::Error),

  /// A failed `authenticate`, reported as `auth_error`.
  #[error("{0}")]
  Auth(#[source] chirp_hub::Error),

  /// A failed `register`, reported as `register_error`.
  #[error("{0}")]
  Register(#[source] chirp_hub::Error),

  /// Any other rejected action, reported as a generic `error`.
  #[error(transparent)]
  Action(#[from] chirp_hub::Error),
}

impl From<chirp_core::Error> for Error {
  fn from(e: chirp_core::Error) -> Self { Self::Action(e.into()) }
}

impl Error {
  pub fn store<E: StoreError>(e: E) -> Self { Self::Action(chirp_hub::Error::store(e)) }

  pub fn not_found(what: &'static str) -> Self { Self::Action(chirp_hub::Error::NotFound(what)) }

  /// The underlying store failure, whichever action it surfaced through.
  pub fn store_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
    match self {
      Error::Auth(chirp_hub::Error::StoreUnavailable(source))
      | Error::Register(chirp_hub::Error::StoreUnavailable(source))
      | Error::Action(chirp_hub::Error::StoreUnavailable(source)) => Some(source.as_ref()),
      _ => None,
    }
  }

  pub fn code(&self) -> ErrorCode {
    match self {
      Error::Decode(_) => ErrorCode::InvalidInput,
      Error::Auth(e) | Error::Register(e) | Error::Action(e) => e.code(),
    }
  }

  /// The reply that tells the requesting connection what went wrong.
  pub fn into_reply(self) -> Reply {
    let code = self.code();
    match self {
      Error::Auth(chirp_hub::Error::AlreadyAuthenticated) => {
        Reply::Error { code, message: chirp_hub::Error::AlreadyAuthenticated.to_string() }
      }
      Error::Auth(e) => Reply::AuthError { message: e.to_string() },
      Error::Register(e) => Reply::RegisterError {
        code,
        message: e.to_string(),
        retryable: e.is_retryable(),
      },
      other => Reply::Error { code, message: other.to_string() },
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn auth_failures_become_auth_error() {
    let reply = Error::Auth(chirp_hub::Error::AuthFailed).into_reply();
    assert_eq!(reply, Reply::AuthError { message: "invalid session id".into() });
  }

  #[test]
  fn repeated_authentication_is_a_generic_error() {
    let reply = Error::Auth(chirp_hub::Error::AlreadyAuthenticated).into_reply();
    assert!(matches!(reply, Reply::Error { code: ErrorCode::AlreadyAuthenticated, .. }));
  }

  #[test]
  fn register_errors_carry_retryable() {
    let reply = Error::Register(chirp_hub::Error::SessionIdExhausted).into_reply();
    assert!(matches!(reply, Reply::RegisterError {
      code: ErrorCode::SessionIdExhausted,
      retryable: true,
      ..
    }));

    let reply = Error::Register(chirp_hub::Error::UsernameTaken("a".into())).into_reply();
    assert!(matches!(reply, Reply::RegisterError { retryable: false, .. }));
  }

  #[derive(Debug, Error)]
  #[error("disk on fire")]
  struct Broken;

  impl StoreError for Broken {}

  #[test]
  fn store_source_is_found_behind_every_wrapper() {
    let wrappers: [fn(chirp_hub::Error) -> Error; 3] = [Error::Auth, Error::Register, Error::Action];
    for wrap in wrappers {
      let err = wrap(chirp_hub::Error::store(Broken));
      assert_eq!(err.store_source().map(ToString::to_string).as_deref(), Some("disk on fire"));
    }
    assert!(Error::Auth(chirp_hub::Error::AuthFailed).store_source().is_none());
  }

  #[test]
  fn validation_errors_are_invalid_input() {
    let err = Error::from(chirp_core::Error::SelfMessage);
    assert_eq!(err.code(), ErrorCode::InvalidInput);
    assert!(matches!(err.into_reply(), Reply::Error { code: ErrorCode::InvalidInput, .. }));
  }
}
