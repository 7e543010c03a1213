//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Session ids are stored verbatim.

use chirp_core::{
  content::{Comment, DirectMessage, Poll, PollOption, Post},
  user::{Profile, SessionId, User},
  validate,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counts ───────────────────────────────────────────────────────────────────

/// SQLite `COUNT(*)` is an `i64` that is never negative.
pub fn decode_count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub session_id: String,
  pub username:   String,
  pub avatar_url: String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         SessionId::parse(&self.session_id)?,
      username:   self.username,
      avatar_url: self.avatar_url,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `comments` row joined with its author.
pub struct RawComment {
  pub comment_id: String,
  pub post_id:    String,
  pub username:   String,
  pub avatar_url: String,
  pub content:    String,
  pub created_at: String,
}

impl RawComment {
  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      post_id:    decode_uuid(&self.post_id)?,
      author:     Profile { username: self.username, avatar_url: self.avatar_url },
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `poll_options` row with its vote count.
pub struct RawPollOption {
  pub option_id: String,
  pub label:     String,
  pub votes:     i64,
}

pub struct RawPoll {
  pub poll_id: String,
  pub options: Vec<RawPollOption>,
}

impl RawPoll {
  pub fn into_poll(self) -> Result<Poll> {
    let options = self
      .options
      .into_iter()
      .map(|o| {
        Ok(PollOption {
          option_id: decode_uuid(&o.option_id)?,
          label:     o.label,
          votes:     decode_count(o.votes),
        })
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Poll::from_options(decode_uuid(&self.poll_id)?, options))
  }
}

/// A `posts` row joined with its author, like count, comments and poll.
pub struct RawPost {
  pub post_id:    String,
  pub username:   String,
  pub avatar_url: String,
  pub content:    String,
  pub image_url:  Option<String>,
  pub gif_url:    Option<String>,
  pub created_at: String,
  pub likes:      i64,
  pub comments:   Vec<RawComment>,
  pub poll:       Option<RawPoll>,
}

impl RawPost {
  pub fn into_post(self) -> Result<Post> {
    let comments = self
      .comments
      .into_iter()
      .map(RawComment::into_comment)
      .collect::<Result<Vec<_>>>()?;
    let poll = self.poll.map(RawPoll::into_poll).transpose()?;
    let mentions = validate::mentions(&self.content);

    Ok(Post {
      post_id: decode_uuid(&self.post_id)?,
      author: Profile { username: self.username, avatar_url: self.avatar_url },
      content: self.content,
      image_url: self.image_url,
      gif_url: self.gif_url,
      poll,
      likes: decode_count(self.likes),
      comments,
      mentions,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `messages` row with sender and recipient usernames resolved.
pub struct RawMessage {
  pub message_id: String,
  pub sender:     String,
  pub recipient:  String,
  pub content:    String,
  pub sent_at:    String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<DirectMessage> {
    Ok(DirectMessage {
      message_id: decode_uuid(&self.message_id)?,
      sender:     self.sender,
      recipient:  self.recipient,
      content:    self.content,
      sent_at:    decode_dt(&self.sent_at)?,
    })
  }
}
