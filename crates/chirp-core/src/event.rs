//! Domain events and their audiences.
//!
//! A domain event is produced after the corresponding content has been
//! written to the store. Events are ephemeral: nothing here is persisted and
//! a connection that is not registered when the event fires never sees it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  content::{Comment, DirectMessage, Poll, Post},
  user::{Profile, SessionId},
};

/// Who an event is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
  /// Every connection registered at the moment of the broadcast.
  All,
  /// Every live connection bound to this user; dropped if there are none.
  SpecificUser(SessionId),
}

/// The discriminant of a [`DomainEvent`], for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  NewPost,
  Like,
  Comment,
  PollVote,
  DirectMessage,
  PresenceChange,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::NewPost => "new_post",
      Self::Like => "post_liked",
      Self::Comment => "new_comment",
      Self::PollVote => "poll_updated",
      Self::DirectMessage => "new_message",
      Self::PresenceChange => "presence",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Something that happened in the feed. The serde tag doubles as the event
/// name on the wire and must match [`EventKind::as_str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
  #[serde(rename = "new_post")]
  NewPost(Post),

  #[serde(rename = "post_liked")]
  Like {
    post_id:  Uuid,
    likes:    u64,
    /// Who liked it.
    username: String,
  },

  #[serde(rename = "new_comment")]
  Comment { post_id: Uuid, comment: Comment },

  #[serde(rename = "poll_updated")]
  PollVote(Poll),

  #[serde(rename = "new_message")]
  DirectMessage(DirectMessage),

  #[serde(rename = "presence")]
  PresenceChange { user: Profile, online: bool },
}

impl DomainEvent {
  pub fn kind(&self) -> EventKind {
    match self {
      Self::NewPost(_) => EventKind::NewPost,
      Self::Like { .. } => EventKind::Like,
      Self::Comment { .. } => EventKind::Comment,
      Self::PollVote(_) => EventKind::PollVote,
      Self::DirectMessage(_) => EventKind::DirectMessage,
      Self::PresenceChange { .. } => EventKind::PresenceChange,
    }
  }
}
