//! Feed content: posts, comments, polls and direct messages.
//!
//! Content is append-only. The only "mutation" the feed knows about is a new
//! like, comment or vote row; counts are always derived from those rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::{Profile, SessionId};

// ─── Posts ───────────────────────────────────────────────────────────────────

/// A post as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    Uuid,
  pub author:     Profile,
  /// The text of the post; for a poll this is the question.
  pub content:    String,
  pub image_url:  Option<String>,
  pub gif_url:    Option<String>,
  pub poll:       Option<Poll>,
  pub likes:      u64,
  pub comments:   Vec<Comment>,
  /// Usernames referenced with `@name`, derived from `content`.
  pub mentions:   Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ContentStore::append_post`].
/// `post_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id: SessionId,
  pub content:   String,
  pub image_url: Option<String>,
  pub gif_url:   Option<String>,
  /// Option labels, in display order. Empty for a plain post.
  pub poll:      Vec<String>,
}

impl NewPost {
  /// A text-only post.
  pub fn text(author_id: SessionId, content: impl Into<String>) -> Self {
    Self {
      author_id,
      content: content.into(),
      image_url: None,
      gif_url: None,
      poll: Vec::new(),
    }
  }

  /// A poll whose question is `question`.
  pub fn poll(
    author_id: SessionId,
    question: impl Into<String>,
    options: Vec<String>,
  ) -> Self {
    Self { poll: options, ..Self::text(author_id, question) }
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub post_id:    Uuid,
  pub author:     Profile,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
  pub post_id:   Uuid,
  pub author_id: SessionId,
  pub content:   String,
}

// ─── Polls ───────────────────────────────────────────────────────────────────

/// A poll attached to a post, with its current tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
  pub poll_id:     Uuid,
  pub options:     Vec<PollOption>,
  /// Always equal to the sum of `options[..].votes`, i.e. the number of
  /// distinct users who voted.
  pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
  pub option_id: Uuid,
  pub label:     String,
  pub votes:     u64,
}

impl Poll {
  /// Build a poll from its options, deriving `total_votes`.
  pub fn from_options(poll_id: Uuid, options: Vec<PollOption>) -> Self {
    let total_votes = options.iter().map(|o| o.votes).sum();
    Self { poll_id, options, total_votes }
  }
}

#[derive(Debug, Clone)]
pub struct NewVote {
  pub poll_id:   Uuid,
  pub option_id: Uuid,
  pub user_id:   SessionId,
}

// ─── Direct messages ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
  pub message_id: Uuid,
  /// Sender's username.
  pub sender:     String,
  /// Recipient's username.
  pub recipient:  String,
  pub content:    String,
  pub sent_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender_id:    SessionId,
  pub recipient_id: SessionId,
  pub content:      String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn option(label: &str, votes: u64) -> PollOption {
    PollOption { option_id: Uuid::new_v4(), label: label.into(), votes }
  }

  #[test]
  fn total_votes_is_the_sum_of_the_options() {
    let poll = Poll::from_options(
      Uuid::new_v4(),
      vec![option("tea", 3), option("coffee", 1)],
    );
    assert_eq!(poll.total_votes, 4);
    assert_eq!(poll.options[0].label, "tea");
  }

  #[test]
  fn empty_poll_has_no_votes() {
    let poll =
      Poll::from_options(Uuid::new_v4(), vec![option("yes", 0), option("no", 0)]);
    assert_eq!(poll.total_votes, 0);
  }
}
