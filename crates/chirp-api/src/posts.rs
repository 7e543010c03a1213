//! Handlers for `/posts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/posts` | Newest first; optional `?limit` (default 50, max 200) |
//! | `GET`  | `/posts/:id` | Single post with comments and poll; 404 if missing |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chirp_core::{content::Post, store::ContentStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Clamped to [`MAX_LIMIT`].
  pub limit: Option<usize>,
}

/// `GET /posts[?limit=<n>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Post>>, ApiError>
where
  S: ContentStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
  let posts = store.recent_posts(limit).await.map_err(ApiError::store)?;
  Ok(Json(posts))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /posts/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError>
where
  S: ContentStore,
{
  let post = store
    .get_post(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("post {id} not found")))?;
  Ok(Json(post))
}
