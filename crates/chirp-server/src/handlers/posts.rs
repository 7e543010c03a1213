//! `new_post`, `like_post` and `comment`.

use chirp_core::{
  content::{NewComment, NewPost},
  event::{Audience, DomainEvent},
  user::User,
  validate,
};
use uuid::Uuid;

use crate::{AppState, Backend, Error, Result};

/// A post may have an empty body when it carries an image or a GIF.
pub async fn create<S: Backend>(
  state: &AppState<S>,
  user: &User,
  content: &str,
  image_url: Option<&str>,
  gif_url: Option<&str>,
) -> Result<()> {
  let image_url = validate::optional_url("image_url", image_url)?;
  let gif_url = validate::optional_url("gif_url", gif_url)?;
  let has_media = image_url.is_some() || gif_url.is_some();
  let content = validate::content("content", content, has_media)?;

  let post = state
    .store
    .append_post(NewPost {
      author_id: user.id.clone(),
      content,
      image_url,
      gif_url,
      poll: Vec::new(),
    })
    .await
    .map_err(Error::store)?;

  tracing::info!(user = %user.username, post_id = %post.post_id, "post created");
  state.hub.broadcast(DomainEvent::NewPost(post), Audience::All);
  Ok(())
}

pub async fn like<S: Backend>(state: &AppState<S>, user: &User, post_id: Uuid) -> Result<()> {
  let likes = state
    .store
    .append_like(post_id, user.id.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("post"))?;

  state.hub.broadcast(
    DomainEvent::Like { post_id, likes, username: user.username.clone() },
    Audience::All,
  );
  Ok(())
}

pub async fn comment<S: Backend>(
  state: &AppState<S>,
  user: &User,
  post_id: Uuid,
  content: &str,
) -> Result<()> {
  let content = validate::content("comment", content, false)?;
  let comment = state
    .store
    .append_comment(NewComment { post_id, author_id: user.id.clone(), content })
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("post"))?;

  state.hub.broadcast(DomainEvent::Comment { post_id, comment }, Audience::All);
  Ok(())
}
