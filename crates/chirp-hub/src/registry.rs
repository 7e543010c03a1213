//! The connection registry: which live connections exist, and which user
//! (if any) each one is bound to.
//!
//! Two indexes are kept in lockstep so that neither direction needs a scan:
//! connection → optional user, and user → set of connections. Both are
//! ordered by [`ConnectionId`], which is allocated monotonically, so
//! iteration order is registration order.
//!
//! The registry itself is a plain single-owner value; [`crate::Hub`] is what
//! makes it shareable.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  fmt,
};

use chirp_core::user::{SessionId, User};

use crate::{Error, Result};

// ─── ConnectionId ────────────────────────────────────────────────────────────

/// Opaque handle for one live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
  pub fn new(raw: u64) -> Self { Self(raw) }
}

impl fmt::Display for ConnectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "conn-{}", self.0) }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Result of a successful [`Registry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
  /// `true` when this bind gave the user their first live connection.
  pub came_online: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
  connections: BTreeMap<ConnectionId, Option<User>>,
  by_user:     HashMap<SessionId, BTreeSet<ConnectionId>>,
  /// Users who lost their last connection and whose offline announcement is
  /// still outstanding, keyed to the departure that left them offline.
  departing:   HashMap<SessionId, u64>,
  departures:  u64,
}

impl Registry {
  pub fn new() -> Self { Self::default() }

  /// Register an unauthenticated connection. It receives `All` broadcasts
  /// from now on. Opening an already-open connection changes nothing.
  pub fn open(&mut self, connection: ConnectionId) {
    self.connections.entry(connection).or_insert(None);
  }

  /// Associate `connection` with `user`, opening the connection if needed.
  ///
  /// Binding the same user twice is a no-op; binding a different user to an
  /// already-bound connection fails with [`Error::AlreadyBound`]. A bind that
  /// cancels an outstanding departure does not count as coming online, since
  /// the user was never announced offline.
  pub fn bind(&mut self, connection: ConnectionId, user: User) -> Result<Binding> {
    let slot = self.connections.entry(connection).or_insert(None);
    match slot {
      Some(existing) if existing.id == user.id => {
        return Ok(Binding { came_online: false });
      }
      Some(_) => return Err(Error::AlreadyBound(connection)),
      None => {}
    }

    let user_id = user.id.clone();
    let owned = self.by_user.entry(user_id.clone()).or_default();
    let first = owned.is_empty();
    owned.insert(connection);
    *slot = Some(user);

    let resumed = first && self.departing.remove(&user_id).is_some();
    Ok(Binding { came_online: first && !resumed })
  }

  /// Remove `connection` entirely. Returns the user it was bound to, or
  /// `None` if it was unbound or unknown. Calling it twice is harmless.
  pub fn unbind(&mut self, connection: ConnectionId) -> Option<User> {
    let user = self.connections.remove(&connection).flatten()?;

    if let Some(owned) = self.by_user.get_mut(&user.id) {
      owned.remove(&connection);
      if owned.is_empty() {
        self.by_user.remove(&user.id);
      }
    }
    Some(user)
  }

  pub fn user_of(&self, connection: ConnectionId) -> Option<&User> {
    self.connections.get(&connection).and_then(Option::as_ref)
  }

  /// Live connections bound to `user_id`, in registration order.
  pub fn connections_for(&self, user_id: &SessionId) -> Vec<ConnectionId> {
    self
      .by_user
      .get(user_id)
      .map(|owned| owned.iter().copied().collect())
      .unwrap_or_default()
  }

  /// Every registered connection, bound or not, in registration order.
  pub fn all_connections(&self) -> Vec<ConnectionId> {
    self.connections.keys().copied().collect()
  }

  /// A copy of every distinct bound user, ordered by their earliest live
  /// connection.
  pub fn all_bound_users(&self) -> Vec<User> {
    let mut seen = BTreeSet::new();
    self
      .connections
      .values()
      .flatten()
      .filter(|user| seen.insert(user.id.clone()))
      .cloned()
      .collect()
  }

  pub fn is_online(&self, user_id: &SessionId) -> bool { self.by_user.contains_key(user_id) }

  /// Record that `user_id` just lost their last connection. The returned
  /// number identifies this departure; it replaces any earlier one.
  pub fn begin_departure(&mut self, user_id: &SessionId) -> u64 {
    self.departures += 1;
    self.departing.insert(user_id.clone(), self.departures);
    self.departures
  }

  /// Settle `departure` for `user_id`. Returns `true` exactly once, and only
  /// if neither a reconnect nor a later departure has superseded it.
  pub fn settle_departure(&mut self, user_id: &SessionId, departure: u64) -> bool {
    if self.departing.get(user_id) != Some(&departure) {
      return false;
    }
    self.departing.remove(user_id);
    true
  }

  pub fn len(&self) -> usize { self.connections.len() }

  pub fn is_empty(&self) -> bool { self.connections.is_empty() }
}
