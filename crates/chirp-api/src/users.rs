//! Handler for `/users/:username`. Only the public [`Profile`] is exposed;
//! the session id never leaves the store through this API.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chirp_core::{store::SessionStore, user::Profile};

use crate::error::ApiError;

/// `GET /users/:username`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(username): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: SessionStore,
{
  let user = store
    .find_by_username(username.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {username:?} not found")))?;
  Ok(Json(user.profile()))
}
