//! Error type for `chirp-store-sqlite`.

use chirp_core::store::{Conflict, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] chirp_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("{0} not found after insert")]
  MissingAfterInsert(&'static str),

  /// A uniqueness constraint rejected the write.
  #[error("{0:?} is already taken")]
  Conflict(Conflict),
}

impl StoreError for Error {
  fn conflict(&self) -> Option<Conflict> {
    match self {
      Error::Conflict(c) => Some(*c),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
