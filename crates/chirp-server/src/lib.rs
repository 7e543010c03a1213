//! The Chirp server: a WebSocket endpoint for the realtime feed plus the
//! read-only REST API, over any store that implements both
//! [`SessionStore`] and [`ContentStore`].

pub mod error;
pub mod handlers;
pub mod session;
pub mod ws;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{State, WebSocketUpgrade},
  response::Response,
  routing::get,
};
use chirp_core::{
  store::{ContentStore, SessionStore},
  user::Profile,
};
use chirp_hub::Hub;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use ws::transport::ChannelTransport;

/// Everything a store backend has to provide for the server to run on it.
pub trait Backend: SessionStore + ContentStore + 'static {}

impl<S: SessionStore + ContentStore + 'static> Backend for S {}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CHIRP_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// SQLite database file, or `:memory:`.
  pub store_path:            PathBuf,
  /// Posts sent to a connection right after it authenticates.
  pub feed_limit:            usize,
  /// Upper bound on `get_messages`, and its default.
  pub message_history_limit: usize,
  /// Delay before announcing that a user went offline. `0` announces at
  /// once.
  pub presence_grace_ms:     u64,
  /// Close connections that have not authenticated within this many
  /// seconds. Unset means never.
  pub auth_timeout_secs:     Option<u64>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "0.0.0.0".to_owned(),
      port:                  3000,
      store_path:            PathBuf::from("chirp.db"),
      feed_limit:            50,
      message_history_limit: 100,
      presence_grace_ms:     0,
      auth_timeout_secs:     None,
    }
  }
}

impl ServerConfig {
  pub fn presence_grace(&self) -> Option<Duration> {
    (self.presence_grace_ms > 0).then(|| Duration::from_millis(self.presence_grace_ms))
  }

  pub fn auth_timeout(&self) -> Option<Duration> {
    self.auth_timeout_secs.map(Duration::from_secs)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers and connection tasks.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub hub:    Arc<Hub<ChannelTransport>>,
  pub config: Arc<ServerConfig>,
}

impl<S: Backend> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      hub:    Arc::new(Hub::new(ChannelTransport::default())),
      config: Arc::new(config),
    }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      hub:    Arc::clone(&self.hub),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full axum [`Router`]: `/ws`, `/health`, `/online` and the REST
/// API under `/api`.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  let api = chirp_api::api_router(Arc::clone(&state.store));

  Router::new()
    .route("/health", get(health))
    .route("/online", get(online::<S>))
    .route("/ws",     get(ws_upgrade::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// `GET /online`: profiles of every user with a live connection.
async fn online<S: Backend>(State(state): State<AppState<S>>) -> Json<Vec<Profile>> {
  Json(handlers::presence::online_profiles(&state))
}

/// `GET /ws`: upgrade and hand the socket to a connection actor. Clients
/// authenticate over the socket, not during the upgrade.
async fn ws_upgrade<S: Backend>(
  State(state): State<AppState<S>>,
  ws: WebSocketUpgrade,
) -> Response {
  ws.on_upgrade(move |socket| ws::actor::run_connection(socket, state))
}

#[cfg(test)]
mod tests;
