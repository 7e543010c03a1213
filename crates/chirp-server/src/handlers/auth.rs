//! `authenticate` and `register`.

use chirp_core::{protocol::Reply, user::SessionId};
use chirp_hub::{
  ConnectionId,
  handshake::{Authenticated, Handshake},
};

use crate::{AppState, Backend, Error, Result, handlers::presence};

pub async fn login<S: Backend>(
  state: &AppState<S>,
  handshake: &mut Handshake,
  raw_id: &str,
) -> Result<()> {
  let auth = handshake
    .login(state.store.as_ref(), &state.hub, raw_id)
    .await
    .map_err(Error::Auth)?;
  welcome(state, handshake.connection(), auth, None).await
}

pub async fn register<S: Backend>(
  state: &AppState<S>,
  handshake: &mut Handshake,
  username: &str,
  avatar_url: Option<&str>,
) -> Result<()> {
  let auth = handshake
    .register(state.store.as_ref(), &state.hub, username, avatar_url)
    .await
    .map_err(Error::Register)?;
  let session_id = auth.user.id.clone();
  welcome(state, handshake.connection(), auth, Some(session_id)).await
}

/// Everything a freshly bound connection is sent: the auth result, the
/// recent feed and the online snapshot, in that order. The user's arrival is
/// announced to everyone last, and only for their first connection.
async fn welcome<S: Backend>(
  state: &AppState<S>,
  connection: ConnectionId,
  auth: Authenticated,
  session_id: Option<SessionId>,
) -> Result<()> {
  let user = &auth.user;
  tracing::info!(%connection, user = %user.username, is_new = auth.is_new, "connection authenticated");

  state.hub.send(connection, Reply::AuthSuccess {
    username: user.username.clone(),
    avatar_url: user.avatar_url.clone(),
    session_id,
    is_new: auth.is_new,
  });

  let feed = match state.store.recent_posts(state.config.feed_limit).await {
    Ok(posts) => {
      state.hub.send(connection, Reply::InitialPosts { posts });
      Ok(())
    }
    Err(e) => Err(Error::store(e)),
  };

  presence::send_online_users(state, connection);
  if auth.binding.came_online {
    presence::announce(state, user, true);
  }
  feed
}
