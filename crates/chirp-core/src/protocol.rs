//! The JSON message schema spoken over a client connection.
//!
//! Every frame in either direction is an object of the form
//! `{"type": "<snake_case name>", "data": <payload>}`.
//!
//! | direction | enum |
//! |-----------|------|
//! | client → server | [`ClientMessage`] |
//! | server → one connection | [`Reply`] |
//! | server → audience | [`DomainEvent`] |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  content::{DirectMessage, Post},
  event::DomainEvent,
  user::{Profile, SessionId},
};

// ─── Client → server ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
  /// Log in with an existing session id.
  Authenticate { session_id: String },
  /// Create an account and log in with it.
  Register {
    username:   String,
    #[serde(default)]
    avatar_url: Option<String>,
  },
  NewPost {
    content:   String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    gif_url:   Option<String>,
  },
  CreatePoll { question: String, options: Vec<String> },
  LikePost { post_id: Uuid },
  Comment { post_id: Uuid, content: String },
  VotePoll { poll_id: Uuid, option_id: Uuid },
  SendMessage { recipient: String, content: String },
  GetMessages {
    #[serde(default)]
    limit: Option<usize>,
  },
  OnlineUsers,
}

impl ClientMessage {
  /// The wire name of this message, for logs.
  pub fn action(&self) -> &'static str {
    match self {
      Self::Authenticate { .. } => "authenticate",
      Self::Register { .. } => "register",
      Self::NewPost { .. } => "new_post",
      Self::CreatePoll { .. } => "create_poll",
      Self::LikePost { .. } => "like_post",
      Self::Comment { .. } => "comment",
      Self::VotePoll { .. } => "vote_poll",
      Self::SendMessage { .. } => "send_message",
      Self::GetMessages { .. } => "get_messages",
      Self::OnlineUsers => "online_users",
    }
  }
}

// ─── Server → requester ──────────────────────────────────────────────────────

/// Machine-readable error category carried by [`Reply::Error`] and
/// [`Reply::RegisterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
  AuthError,
  AlreadyAuthenticated,
  UsernameTaken,
  SessionIdExhausted,
  NotAuthenticated,
  InvalidInput,
  NotFound,
  StoreUnavailable,
}

/// A message addressed to exactly one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Reply {
  AuthSuccess {
    username:   String,
    avatar_url: String,
    /// Only present right after registration; the client must keep it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<SessionId>,
    is_new:     bool,
  },
  AuthError { message: String },
  RegisterError {
    code:      ErrorCode,
    message:   String,
    retryable: bool,
  },
  InitialPosts { posts: Vec<Post> },
  OnlineUsers { users: Vec<Profile> },
  Messages { messages: Vec<DirectMessage> },
  MessageSent(DirectMessage),
  Error { code: ErrorCode, message: String },
}

// ─── Server → connection, either kind ────────────────────────────────────────

/// Anything the server writes to a connection. Domain events are shared
/// between every target of a broadcast, hence the `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
  Domain(Arc<DomainEvent>),
  Reply(Reply),
}

impl From<Reply> for ServerEvent {
  fn from(reply: Reply) -> Self { Self::Reply(reply) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn client_messages_use_type_and_data() {
    let msg: ClientMessage = serde_json::from_value(json!({
      "type": "register",
      "data": { "username": "alice" }
    }))
    .unwrap();
    assert_eq!(msg, ClientMessage::Register {
      username:   "alice".into(),
      avatar_url: None,
    });

    let msg: ClientMessage =
      serde_json::from_value(json!({ "type": "online_users" })).unwrap();
    assert_eq!(msg.action(), "online_users");
  }

  #[test]
  fn auth_success_omits_session_id_for_returning_users() {
    let reply = Reply::AuthSuccess {
      username:   "bob".into(),
      avatar_url: "https://example.com/bob.png".into(),
      session_id: None,
      is_new:     false,
    };
    let json = serde_json::to_value(ServerEvent::from(reply)).unwrap();
    assert_eq!(json["type"], "auth_success");
    assert!(json["data"].get("session_id").is_none());
  }

  #[test]
  fn server_events_deserialise_into_the_right_side() {
    let raw = json!({
      "type": "post_liked",
      "data": { "post_id": Uuid::nil(), "likes": 2, "username": "a" }
    });
    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    assert!(matches!(event, ServerEvent::Domain(ref e) if matches!(**e, DomainEvent::Like { likes: 2, .. })));

    let raw = json!({
      "type": "error",
      "data": { "code": "not_authenticated", "message": "nope" }
    });
    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    assert!(matches!(
      event,
      ServerEvent::Reply(Reply::Error { code: ErrorCode::NotAuthenticated, .. })
    ));
  }
}
