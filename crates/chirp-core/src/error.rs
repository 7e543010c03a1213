//! Error types for `chirp-core`.

use thiserror::Error;

/// A rejected piece of user input. The message is safe to show to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{field} must not be empty")]
  Empty { field: &'static str },

  #[error("{field} is limited to {max} characters")]
  TooLong { field: &'static str, max: usize },

  #[error("session id must be exactly 16 digits")]
  MalformedSessionId,

  #[error("username may only contain letters, digits and underscores")]
  InvalidUsername,

  #[error("{field} must be an http or https URL")]
  InvalidUrl { field: &'static str },

  #[error("a poll needs between {min} and {max} options")]
  PollOptionCount { min: usize, max: usize },

  #[error("poll option {0:?} appears more than once")]
  DuplicatePollOption(String),

  #[error("cannot send a direct message to yourself")]
  SelfMessage,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
