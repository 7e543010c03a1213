//! Users, their public profiles, and the session id that identifies them.
//!
//! A user's identity is the session id, never the username. The session id
//! doubles as the login credential, so it only ever leaves the server in the
//! registering connection's own `auth_success` reply.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of decimal digits in a session id.
pub const SESSION_ID_LEN: usize = 16;

/// Number of distinct session ids, `10^16`.
pub const SESSION_ID_SPACE: u64 = 10_000_000_000_000_000;

// ─── SessionId ───────────────────────────────────────────────────────────────

/// A 16-digit decimal string. Leading zeros are significant.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
  /// Parse a caller-supplied session id, trimming surrounding whitespace.
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    if raw.len() == SESSION_ID_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(raw.to_owned()))
    } else {
      Err(Error::MalformedSessionId)
    }
  }

  /// Build a zero-padded session id from `n`, or `None` if `n` has more than
  /// [`SESSION_ID_LEN`] digits.
  pub fn from_number(n: u64) -> Option<Self> {
    (n < SESSION_ID_SPACE).then(|| Self(format!("{n:0width$}", width = SESSION_ID_LEN)))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for SessionId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<SessionId> for String {
  fn from(id: SessionId) -> Self { id.0 }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// Keep credentials out of `{:?}` output in logs.
impl fmt::Debug for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SessionId(…{})", &self.0[SESSION_ID_LEN - 4..])
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A registered account. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id:         SessionId,
  pub username:   String,
  pub avatar_url: String,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn profile(&self) -> Profile {
    Profile {
      username:   self.username.clone(),
      avatar_url: self.avatar_url.clone(),
    }
  }
}

/// The public face of a user: what other clients are allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub username:   String,
  pub avatar_url: String,
}

/// Input to [`crate::store::SessionStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub session_id: SessionId,
  pub username:   String,
  pub avatar_url: String,
}
