//! Who is online, and telling everyone when that changes.

use chirp_core::{
  event::{Audience, DomainEvent},
  protocol::Reply,
  user::{Profile, User},
};
use chirp_hub::{ConnectionId, hub::Departure};

use crate::{AppState, Backend};

pub fn online_profiles<S: Backend>(state: &AppState<S>) -> Vec<Profile> {
  state.hub.online_users().iter().map(User::profile).collect()
}

pub fn send_online_users<S: Backend>(state: &AppState<S>, connection: ConnectionId) {
  state.hub.send(connection, Reply::OnlineUsers { users: online_profiles(state) });
}

pub fn announce<S: Backend>(state: &AppState<S>, user: &User, online: bool) {
  tracing::info!(user = %user.username, online, "presence changed");
  state.hub.broadcast(DomainEvent::PresenceChange { user: user.profile(), online }, Audience::All);
}

/// Announce a departed user as offline, either now or after the configured
/// grace period. The announcement is dropped if the user reconnects or
/// departs again in the meantime; a reconnect inside the window is then not
/// announced as online either.
pub fn depart<S: Backend>(state: &AppState<S>, departure: Departure) {
  let Departure { user, offline: Some(pending) } = departure else {
    return;
  };

  let Some(grace) = state.config.presence_grace() else {
    if state.hub.confirm_offline(&user.id, pending) {
      announce(state, &user, false);
    }
    return;
  };

  let state = state.clone();
  tokio::spawn(async move {
    tokio::time::sleep(grace).await;
    if !state.hub.confirm_offline(&user.id, pending) {
      tracing::debug!(user = %user.username, "departure superseded within grace period");
      return;
    }
    announce(&state, &user, false);
  });
}
