//! `create_poll` and `vote_poll`. A poll is a post whose content is the
//! question; it is announced with the same `new_post` event.

use chirp_core::{
  content::{NewPost, NewVote},
  event::{Audience, DomainEvent},
  user::User,
  validate,
};
use uuid::Uuid;

use crate::{AppState, Backend, Error, Result};

pub async fn create<S: Backend>(
  state: &AppState<S>,
  user: &User,
  question: &str,
  options: &[String],
) -> Result<()> {
  let question = validate::content("question", question, false)?;
  let options = validate::poll_options(options)?;

  let post = state
    .store
    .append_post(NewPost::poll(user.id.clone(), question, options))
    .await
    .map_err(Error::store)?;

  tracing::info!(user = %user.username, post_id = %post.post_id, "poll created");
  state.hub.broadcast(DomainEvent::NewPost(post), Audience::All);
  Ok(())
}

/// Only a user's first vote on a poll counts; later votes still broadcast
/// the unchanged tally.
pub async fn vote<S: Backend>(
  state: &AppState<S>,
  user: &User,
  poll_id: Uuid,
  option_id: Uuid,
) -> Result<()> {
  let poll = state
    .store
    .append_vote(NewVote { poll_id, option_id, user_id: user.id.clone() })
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("poll option"))?;

  state.hub.broadcast(DomainEvent::PollVote(poll), Audience::All);
  Ok(())
}
