//! [`SqliteStore`]: the SQLite implementation of [`SessionStore`] and
//! [`ContentStore`].

use std::path::Path;

use chirp_core::{
  content::{
    Comment, DirectMessage, NewComment, NewMessage, NewPost, NewVote, Poll, Post,
  },
  store::{Conflict, ContentStore, SessionStore},
  user::{NewUser, SessionId, User},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    decode_count, encode_dt, encode_uuid, RawComment, RawMessage, RawPoll,
    RawPollOption, RawPost, RawUser,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Chirp store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────
//
// Plain synchronous helpers, run inside `Connection::call` closures so that a
// multi-table read sees a single consistent snapshot.

const POST_SELECT: &str = "
  SELECT p.post_id, u.username, u.avatar_url, p.content,
         p.image_url, p.gif_url, p.created_at,
         (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.post_id)
  FROM posts p
  JOIN users u ON u.session_id = p.author_id";

const COMMENT_SELECT: &str = "
  SELECT c.comment_id, c.post_id, u.username, u.avatar_url,
         c.content, c.created_at
  FROM comments c
  JOIN users u ON u.session_id = c.author_id";

const MESSAGE_SELECT: &str = "
  SELECT m.message_id, s.username, r.username, m.content, m.sent_at
  FROM messages m
  JOIN users s ON s.session_id = m.sender_id
  JOIN users r ON r.session_id = m.recipient_id";

enum PostFilter {
  Id(String),
  Recent(i64),
}

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    session_id: row.get(0)?,
    username:   row.get(1)?,
    avatar_url: row.get(2)?,
    created_at: row.get(3)?,
  })
}

fn read_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPost> {
  Ok(RawPost {
    post_id:    row.get(0)?,
    username:   row.get(1)?,
    avatar_url: row.get(2)?,
    content:    row.get(3)?,
    image_url:  row.get(4)?,
    gif_url:    row.get(5)?,
    created_at: row.get(6)?,
    likes:      row.get(7)?,
    comments:   Vec::new(),
    poll:       None,
  })
}

fn read_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawComment> {
  Ok(RawComment {
    comment_id: row.get(0)?,
    post_id:    row.get(1)?,
    username:   row.get(2)?,
    avatar_url: row.get(3)?,
    content:    row.get(4)?,
    created_at: row.get(5)?,
  })
}

fn read_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    message_id: row.get(0)?,
    sender:     row.get(1)?,
    recipient:  row.get(2)?,
    content:    row.get(3)?,
    sent_at:    row.get(4)?,
  })
}

fn select_user(
  conn: &rusqlite::Connection,
  column: &'static str,
  value: String,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!(
        "SELECT session_id, username, avatar_url, created_at FROM users WHERE {column} = ?1"
      ),
      rusqlite::params![value],
      read_user,
    )
    .optional()
}

fn post_exists(conn: &rusqlite::Connection, post_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM posts WHERE post_id = ?1",
        rusqlite::params![post_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn select_comments(
  conn: &rusqlite::Connection,
  post_id: &str,
) -> rusqlite::Result<Vec<RawComment>> {
  let mut stmt =
    conn.prepare(&format!("{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.rowid"))?;
  let rows = stmt
    .query_map(rusqlite::params![post_id], read_comment)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_poll_options(
  conn: &rusqlite::Connection,
  poll_id: &str,
) -> rusqlite::Result<Vec<RawPollOption>> {
  let mut stmt = conn.prepare(
    "SELECT o.option_id, o.label, COUNT(v.user_id)
     FROM poll_options o
     LEFT JOIN poll_votes v ON v.option_id = o.option_id
     WHERE o.poll_id = ?1
     GROUP BY o.option_id
     ORDER BY o.position",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![poll_id], |row| {
      Ok(RawPollOption {
        option_id: row.get(0)?,
        label:     row.get(1)?,
        votes:     row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_poll_for_post(
  conn: &rusqlite::Connection,
  post_id: &str,
) -> rusqlite::Result<Option<RawPoll>> {
  let poll_id: Option<String> = conn
    .query_row(
      "SELECT poll_id FROM polls WHERE post_id = ?1",
      rusqlite::params![post_id],
      |r| r.get(0),
    )
    .optional()?;

  match poll_id {
    Some(poll_id) => {
      let options = select_poll_options(conn, &poll_id)?;
      Ok(Some(RawPoll { poll_id, options }))
    }
    None => Ok(None),
  }
}

fn select_posts(
  conn: &rusqlite::Connection,
  filter: PostFilter,
) -> rusqlite::Result<Vec<RawPost>> {
  let mut posts = match filter {
    PostFilter::Id(id) => {
      let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.post_id = ?1"))?;
      let rows = stmt
        .query_map(rusqlite::params![id], read_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      rows
    }
    PostFilter::Recent(limit) => {
      let mut stmt =
        conn.prepare(&format!("{POST_SELECT} ORDER BY p.rowid DESC LIMIT ?1"))?;
      let rows = stmt
        .query_map(rusqlite::params![limit], read_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      rows
    }
  };

  for post in &mut posts {
    post.comments = select_comments(conn, &post.post_id)?;
    post.poll = select_poll_for_post(conn, &post.post_id)?;
  }
  Ok(posts)
}

/// Map a SQLite unique-constraint message onto the column that caused it.
fn classify_conflict(message: Option<&str>) -> Conflict {
  match message {
    Some(m) if m.contains("users.username") => Conflict::Username,
    _ => Conflict::SessionId,
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn find_by_id(&self, id: SessionId) -> Result<Option<User>> {
    let id_str = id.to_string();

    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, "session_id", id_str)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_by_username(&self, username: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, "username", username)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      id:         input.session_id,
      username:   input.username,
      avatar_url: input.avatar_url,
      created_at: Utc::now(),
    };

    let id_str     = user.id.to_string();
    let username   = user.username.clone();
    let avatar_url = user.avatar_url.clone();
    let at_str     = encode_dt(user.created_at);

    let conflict = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (session_id, username, avatar_url, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, username, avatar_url, at_str],
        );
        match inserted {
          Ok(_) => Ok(None),
          Err(rusqlite::Error::SqliteFailure(err, message))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(Some(classify_conflict(message.as_deref())))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match conflict {
      Some(c) => Err(Error::Conflict(c)),
      None => Ok(user),
    }
  }
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = Error;

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn append_post(&self, input: NewPost) -> Result<Post> {
    let NewPost { author_id, content, image_url, gif_url, poll } = input;

    let post_id_str = encode_uuid(Uuid::new_v4());
    let author_str  = author_id.to_string();
    let at_str      = encode_dt(Utc::now());
    let poll_rows   = (!poll.is_empty()).then(|| {
      let options: Vec<(String, String)> = poll
        .into_iter()
        .map(|label| (encode_uuid(Uuid::new_v4()), label))
        .collect();
      (encode_uuid(Uuid::new_v4()), options)
    });

    let mut raws = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO posts (post_id, author_id, content, image_url, gif_url, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![post_id_str, author_str, content, image_url, gif_url, at_str],
        )?;

        if let Some((poll_id, options)) = &poll_rows {
          tx.execute(
            "INSERT INTO polls (poll_id, post_id) VALUES (?1, ?2)",
            rusqlite::params![poll_id, post_id_str],
          )?;
          for (position, (option_id, label)) in options.iter().enumerate() {
            tx.execute(
              "INSERT INTO poll_options (option_id, poll_id, position, label)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![option_id, poll_id, position as i64, label],
            )?;
          }
        }

        let posts = select_posts(&tx, PostFilter::Id(post_id_str))?;
        tx.commit()?;
        Ok(posts)
      })
      .await?;

    raws
      .pop()
      .ok_or(Error::MissingAfterInsert("post"))?
      .into_post()
  }

  async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);

    let mut raws = self
      .conn
      .call(move |conn| Ok(select_posts(conn, PostFilter::Id(id_str))?))
      .await?;

    raws.pop().map(RawPost::into_post).transpose()
  }

  async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws = self
      .conn
      .call(move |conn| Ok(select_posts(conn, PostFilter::Recent(limit_val))?))
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  // ── Reactions ─────────────────────────────────────────────────────────────

  async fn append_like(&self, post_id: Uuid, user_id: SessionId) -> Result<Option<u64>> {
    let post_id_str = encode_uuid(post_id);
    let user_str    = user_id.to_string();
    let at_str      = encode_dt(Utc::now());

    let likes: Option<i64> = self
      .conn
      .call(move |conn| {
        if !post_exists(conn, &post_id_str)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT OR IGNORE INTO likes (post_id, user_id, liked_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![post_id_str, user_str, at_str],
        )?;
        let count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
          rusqlite::params![post_id_str],
          |r| r.get(0),
        )?;
        Ok(Some(count))
      })
      .await?;

    Ok(likes.map(decode_count))
  }

  async fn append_comment(&self, input: NewComment) -> Result<Option<Comment>> {
    let comment_id_str = encode_uuid(Uuid::new_v4());
    let post_id_str    = encode_uuid(input.post_id);
    let author_str     = input.author_id.to_string();
    let content        = input.content;
    let at_str         = encode_dt(Utc::now());

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        if !post_exists(conn, &post_id_str)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO comments (comment_id, post_id, author_id, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![comment_id_str, post_id_str, author_str, content, at_str],
        )?;
        let comment = conn.query_row(
          &format!("{COMMENT_SELECT} WHERE c.comment_id = ?1"),
          rusqlite::params![comment_id_str],
          read_comment,
        )?;
        Ok(Some(comment))
      })
      .await?;

    raw.map(RawComment::into_comment).transpose()
  }

  async fn append_vote(&self, input: NewVote) -> Result<Option<Poll>> {
    let poll_id_str   = encode_uuid(input.poll_id);
    let option_id_str = encode_uuid(input.option_id);
    let user_str      = input.user_id.to_string();
    let at_str        = encode_dt(Utc::now());

    let raw: Option<RawPoll> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let valid = tx
          .query_row(
            "SELECT 1 FROM poll_options WHERE option_id = ?1 AND poll_id = ?2",
            rusqlite::params![option_id_str, poll_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !valid {
          return Ok(None);
        }

        tx.execute(
          "INSERT OR IGNORE INTO poll_votes (poll_id, user_id, option_id, voted_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![poll_id_str, user_str, option_id_str, at_str],
        )?;
        let options = select_poll_options(&tx, &poll_id_str)?;
        tx.commit()?;
        Ok(Some(RawPoll { poll_id: poll_id_str, options }))
      })
      .await?;

    raw.map(RawPoll::into_poll).transpose()
  }

  // ── Direct messages ───────────────────────────────────────────────────────

  async fn append_message(&self, input: NewMessage) -> Result<DirectMessage> {
    let message_id_str = encode_uuid(Uuid::new_v4());
    let sender_str     = input.sender_id.to_string();
    let recipient_str  = input.recipient_id.to_string();
    let content        = input.content;
    let at_str         = encode_dt(Utc::now());

    let raw: RawMessage = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (message_id, sender_id, recipient_id, content, sent_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![message_id_str, sender_str, recipient_str, content, at_str],
        )?;
        let message = conn.query_row(
          &format!("{MESSAGE_SELECT} WHERE m.message_id = ?1"),
          rusqlite::params![message_id_str],
          read_message,
        )?;
        Ok(message)
      })
      .await?;

    raw.into_message()
  }

  async fn messages_for(&self, user_id: SessionId, limit: usize) -> Result<Vec<DirectMessage>> {
    let user_str  = user_id.to_string();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let mut raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{MESSAGE_SELECT}
           WHERE m.sender_id = ?1 OR m.recipient_id = ?1
           ORDER BY m.rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], read_message)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // Fetched newest first so LIMIT keeps the latest; hand back oldest first.
    raws.reverse();
    raws.into_iter().map(RawMessage::into_message).collect()
  }
}
