//! [`Hub`]: owner of the connection registry and the event broadcaster.
//!
//! Every registry mutation and every audience lookup happens inside one
//! short critical section that never awaits. Delivery happens after the
//! lock is released, against the snapshot of targets taken under it, so a
//! connection registered after a broadcast starts can never receive it.

use std::sync::{
  Arc, Mutex, MutexGuard, PoisonError,
  atomic::{AtomicU64, Ordering},
};

use chirp_core::{
  event::{Audience, DomainEvent},
  protocol::{Reply, ServerEvent},
  user::{SessionId, User},
};

use crate::{
  Result,
  registry::{Binding, ConnectionId, Registry},
};

// ─── Transport ───────────────────────────────────────────────────────────────

/// Fire-and-forget delivery to one connection.
pub trait Transport: Send + Sync {
  /// Queue `event` for `connection`. Returns whether the connection was still
  /// live at call time; the result is informational only.
  fn send(&self, connection: ConnectionId, event: ServerEvent) -> bool;
}

/// What one broadcast did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
  /// Targets resolved from the audience.
  pub attempted: usize,
  /// Targets whose transport accepted the event.
  pub delivered: usize,
}

/// Result of [`Hub::disconnect`] for a bound connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
  pub user:    User,
  /// Set when the user has no live connection left. Hand it to
  /// [`Hub::confirm_offline`] before announcing the user offline.
  pub offline: Option<PendingOffline>,
}

impl Departure {
  pub fn went_offline(&self) -> bool { self.offline.is_some() }
}

/// An offline announcement that a reconnect or a later departure may still
/// cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOffline(u64);

// ─── Hub ─────────────────────────────────────────────────────────────────────

pub struct Hub<T> {
  registry:  Mutex<Registry>,
  next_id:   AtomicU64,
  transport: T,
}

impl<T: Transport> Hub<T> {
  pub fn new(transport: T) -> Self {
    Self {
      registry: Mutex::new(Registry::new()),
      next_id: AtomicU64::new(1),
      transport,
    }
  }

  pub fn transport(&self) -> &T { &self.transport }

  fn registry(&self) -> MutexGuard<'_, Registry> {
    // Registry mutations cannot panic halfway, so poison carries no meaning.
    self.registry.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ── Membership ────────────────────────────────────────────────────────────

  /// Reserve a fresh connection id. The connection is not registered until
  /// [`Hub::open`], which lets the caller attach its transport sink first.
  pub fn allocate(&self) -> ConnectionId {
    ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
  }

  pub fn open(&self, connection: ConnectionId) {
    self.registry().open(connection);
    tracing::debug!(%connection, "connection registered");
  }

  pub fn bind(&self, connection: ConnectionId, user: User) -> Result<Binding> {
    let username = user.username.clone();
    let binding = self.registry().bind(connection, user)?;
    tracing::debug!(%connection, user = %username, came_online = binding.came_online, "connection bound");
    Ok(binding)
  }

  /// Remove `connection`. For a bound connection, reports whether its user
  /// just lost their last live connection; both facts are read under the
  /// same lock.
  pub fn disconnect(&self, connection: ConnectionId) -> Option<Departure> {
    let mut registry = self.registry();
    let user = registry.unbind(connection)?;
    let offline = (!registry.is_online(&user.id))
      .then(|| PendingOffline(registry.begin_departure(&user.id)));
    drop(registry);

    tracing::debug!(%connection, user = %user.username, went_offline = offline.is_some(), "connection unbound");
    Some(Departure { user, offline })
  }

  /// Settle a pending offline announcement. Returns `true` at most once per
  /// departure, and only when the user has neither reconnected nor departed
  /// again since.
  pub fn confirm_offline(&self, user_id: &SessionId, pending: PendingOffline) -> bool {
    self.registry().settle_departure(user_id, pending.0)
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub fn user_of(&self, connection: ConnectionId) -> Option<User> {
    self.registry().user_of(connection).cloned()
  }

  pub fn connections_for(&self, user_id: &SessionId) -> Vec<ConnectionId> {
    self.registry().connections_for(user_id)
  }

  pub fn is_online(&self, user_id: &SessionId) -> bool { self.registry().is_online(user_id) }

  /// Snapshot of every user with at least one live connection.
  pub fn online_users(&self) -> Vec<User> { self.registry().all_bound_users() }

  pub fn connection_count(&self) -> usize { self.registry().len() }

  // ── Delivery ──────────────────────────────────────────────────────────────

  /// Deliver `event` to every connection `audience` resolves to right now.
  ///
  /// A target whose transport refuses the event is skipped; it never stops
  /// delivery to the rest. An empty audience drops the event silently.
  pub fn broadcast(&self, event: DomainEvent, audience: Audience) -> Delivery {
    let kind = event.kind();
    let targets = {
      let registry = self.registry();
      match &audience {
        Audience::All => registry.all_connections(),
        Audience::SpecificUser(user_id) => registry.connections_for(user_id),
      }
    };

    if targets.is_empty() {
      tracing::debug!(%kind, ?audience, "no live connections; event dropped");
      return Delivery::default();
    }

    let event = ServerEvent::Domain(Arc::new(event));
    let mut delivered = 0;
    for &connection in &targets {
      if self.transport.send(connection, event.clone()) {
        delivered += 1;
      } else {
        tracing::debug!(%connection, %kind, "skipping stale connection");
      }
    }

    let delivery = Delivery { attempted: targets.len(), delivered };
    tracing::debug!(%kind, attempted = delivery.attempted, delivered, "event broadcast");
    delivery
  }

  /// Send a reply to one connection.
  pub fn send(&self, connection: ConnectionId, reply: Reply) -> bool {
    self.transport.send(connection, reply.into())
  }
}
