//! SQL schema for the Chirp SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Feed order is insertion order, so reads sort on `rowid` rather than on the
/// RFC 3339 timestamp columns.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    session_id  TEXT PRIMARY KEY,          -- 16 decimal digits
    username    TEXT NOT NULL UNIQUE,
    avatar_url  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    post_id     TEXT PRIMARY KEY,
    author_id   TEXT NOT NULL REFERENCES users(session_id),
    content     TEXT NOT NULL,             -- poll question for poll posts
    image_url   TEXT,
    gif_url     TEXT,
    created_at  TEXT NOT NULL
);

-- One row per (post, user); a repeated like is ignored.
CREATE TABLE IF NOT EXISTS likes (
    post_id     TEXT NOT NULL REFERENCES posts(post_id),
    user_id     TEXT NOT NULL REFERENCES users(session_id),
    liked_at    TEXT NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id  TEXT PRIMARY KEY,
    post_id     TEXT NOT NULL REFERENCES posts(post_id),
    author_id   TEXT NOT NULL REFERENCES users(session_id),
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS polls (
    poll_id     TEXT PRIMARY KEY,
    post_id     TEXT NOT NULL UNIQUE REFERENCES posts(post_id)
);

CREATE TABLE IF NOT EXISTS poll_options (
    option_id   TEXT PRIMARY KEY,
    poll_id     TEXT NOT NULL REFERENCES polls(poll_id),
    position    INTEGER NOT NULL,
    label       TEXT NOT NULL,
    UNIQUE (poll_id, position)
);

-- A user votes at most once per poll; the first vote wins.
CREATE TABLE IF NOT EXISTS poll_votes (
    poll_id     TEXT NOT NULL REFERENCES polls(poll_id),
    user_id     TEXT NOT NULL REFERENCES users(session_id),
    option_id   TEXT NOT NULL REFERENCES poll_options(option_id),
    voted_at    TEXT NOT NULL,
    PRIMARY KEY (poll_id, user_id)
);

CREATE TABLE IF NOT EXISTS messages (
    message_id   TEXT PRIMARY KEY,
    sender_id    TEXT NOT NULL REFERENCES users(session_id),
    recipient_id TEXT NOT NULL REFERENCES users(session_id),
    content      TEXT NOT NULL,
    sent_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comments_post_idx       ON comments(post_id);
CREATE INDEX IF NOT EXISTS poll_votes_option_idx   ON poll_votes(option_id);
CREATE INDEX IF NOT EXISTS messages_sender_idx     ON messages(sender_id);
CREATE INDEX IF NOT EXISTS messages_recipient_idx  ON messages(recipient_id);

PRAGMA user_version = 1;
";
