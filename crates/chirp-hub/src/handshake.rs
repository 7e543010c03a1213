//! The per-connection authentication state machine.
//!
//! ```text
//! Unauthenticated ──login/register──▶ Authenticating ──ok──▶ Bound(user)
//!        ▲                                  │
//!        └────────────── rejected ──────────┘
//! ```
//!
//! A connection's frames are handled one at a time, so a [`Handshake`] is
//! owned by its connection task and needs no locking. The only shared state
//! it touches is the hub's registry, at the moment of binding.

use chirp_core::{
  store::{Conflict, SessionStore, StoreError},
  user::{NewUser, SessionId, User},
  validate,
};

use crate::{
  Error, Result,
  hub::{Hub, Transport},
  registry::{Binding, ConnectionId},
  session_id,
};

/// How many fresh session ids registration tries before giving up.
pub const MAX_SESSION_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
  Unauthenticated,
  Authenticating,
  Bound(User),
}

/// Outcome of a successful login or registration.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub user:    User,
  pub binding: Binding,
  /// `true` when the account was created by this handshake.
  pub is_new:  bool,
}

#[derive(Debug)]
pub struct Handshake {
  connection: ConnectionId,
  state:      AuthState,
}

impl Handshake {
  pub fn new(connection: ConnectionId) -> Self {
    Self { connection, state: AuthState::Unauthenticated }
  }

  pub fn connection(&self) -> ConnectionId { self.connection }

  pub fn state(&self) -> &AuthState { &self.state }

  pub fn user(&self) -> Option<&User> {
    match &self.state {
      AuthState::Bound(user) => Some(user),
      _ => None,
    }
  }

  /// The bound user, or [`Error::NotAuthenticated`].
  pub fn require_user(&self) -> Result<&User> { self.user().ok_or(Error::NotAuthenticated) }

  /// Resume an existing account by session id.
  ///
  /// A malformed id is rejected without touching the store.
  pub async fn login<S, T>(&mut self, store: &S, hub: &Hub<T>, raw_id: &str) -> Result<Authenticated>
  where
    S: SessionStore,
    T: Transport,
  {
    self.begin()?;
    let found = match SessionId::parse(raw_id) {
      Ok(id) => store
        .find_by_id(id)
        .await
        .map_err(Error::store)
        .and_then(|user| user.ok_or(Error::AuthFailed)),
      Err(_) => Err(Error::AuthFailed),
    };
    self.settle(hub, found, false)
  }

  /// Create a new account and bind this connection to it.
  pub async fn register<S, T>(
    &mut self,
    store: &S,
    hub: &Hub<T>,
    username: &str,
    avatar_url: Option<&str>,
  ) -> Result<Authenticated>
  where
    S: SessionStore,
    T: Transport,
  {
    self.begin()?;
    let created = create_account(store, username, avatar_url).await;
    self.settle(hub, created, true)
  }

  fn begin(&mut self) -> Result<()> {
    if matches!(self.state, AuthState::Bound(_)) {
      return Err(Error::AlreadyAuthenticated);
    }
    self.state = AuthState::Authenticating;
    Ok(())
  }

  fn settle<T: Transport>(
    &mut self,
    hub: &Hub<T>,
    outcome: Result<User>,
    is_new: bool,
  ) -> Result<Authenticated> {
    let bound = outcome.and_then(|user| {
      let binding = hub.bind(self.connection, user.clone())?;
      Ok(Authenticated { user, binding, is_new })
    });

    match bound {
      Ok(auth) => {
        self.state = AuthState::Bound(auth.user.clone());
        Ok(auth)
      }
      Err(e) => {
        self.state = AuthState::Unauthenticated;
        Err(e)
      }
    }
  }
}

async fn create_account<S: SessionStore>(
  store: &S,
  username: &str,
  avatar_url: Option<&str>,
) -> Result<User> {
  let username = validate::username(username)?;
  let avatar_url = validate::optional_url("avatar_url", avatar_url)?
    .unwrap_or_else(|| validate::default_avatar(&username));

  for attempt in 1..=MAX_SESSION_ID_ATTEMPTS {
    let input = NewUser {
      session_id: session_id::generate(),
      username:   username.clone(),
      avatar_url: avatar_url.clone(),
    };
    match store.create_user(input).await {
      Ok(user) => return Ok(user),
      Err(e) => match e.conflict() {
        Some(Conflict::Username) => return Err(Error::UsernameTaken(username)),
        Some(Conflict::SessionId) => {
          tracing::warn!(attempt, "session id collision during registration");
        }
        None => return Err(Error::store(e)),
      },
    }
  }
  Err(Error::SessionIdExhausted)
}
