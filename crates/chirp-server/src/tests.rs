//! Session-level scenarios against an in-memory store. Each simulated client
//! is a [`Session`] plus the receiving end of its transport channel, so
//! everything the server would write to the socket can be inspected.

use std::time::Duration;

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use chirp_core::store::ContentStore;
use chirp_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, ServerConfig, router, session::Session, ws::transport::EventReceiver};

async fn state() -> AppState<SqliteStore> { state_with(ServerConfig::default()).await }

async fn state_with(config: ServerConfig) -> AppState<SqliteStore> {
  AppState::new(SqliteStore::open_in_memory().await.unwrap(), config)
}

struct Client {
  session: Session<SqliteStore>,
  rx:      EventReceiver,
}

impl Client {
  async fn connect(state: &AppState<SqliteStore>) -> Self {
    let id = state.hub.allocate();
    let rx = state.hub.transport().attach(id);
    state.hub.open(id);
    Self { session: Session::new(state.clone(), id), rx }
  }

  async fn send(&mut self, frame: Value) { self.session.handle_text(&frame.to_string()).await; }

  /// Everything written to this connection since the last drain.
  fn drain(&mut self) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(event) = self.rx.try_recv() {
      out.push(serde_json::to_value(event).unwrap());
    }
    out
  }

  /// Register `username` and discard the welcome burst. Returns the session id.
  async fn register(&mut self, username: &str) -> String {
    self.send(json!({ "type": "register", "data": { "username": username } })).await;
    let events = self.drain();
    let success = find(&events, "auth_success");
    success["data"]["session_id"].as_str().unwrap().to_owned()
  }
}

fn types(events: &[Value]) -> Vec<&str> {
  events.iter().map(|e| e["type"].as_str().unwrap()).collect()
}

fn find<'a>(events: &'a [Value], ty: &str) -> &'a Value {
  events
    .iter()
    .find(|e| e["type"] == ty)
    .unwrap_or_else(|| panic!("no {ty} in {:?}", types(events)))
}

// ── HTTP ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
  let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
  let resp = router(state().await).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn online_lists_bound_profiles_only() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;
  let _anonymous = Client::connect(&state).await;

  let req = Request::builder().uri("/online").body(Body::empty()).unwrap();
  let resp = router(state).oneshot(req).await.unwrap();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();

  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["username"], "alice");
  assert!(body[0].get("session_id").is_none());
}

#[tokio::test]
async fn api_is_nested_under_api_prefix() {
  let req = Request::builder().uri("/api/posts").body(Body::empty()).unwrap();
  let resp = router(state().await).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}

// ── Handshake ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_sends_welcome_in_order() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;

  alice.send(json!({ "type": "register", "data": { "username": "alice" } })).await;
  let events = alice.drain();
  assert_eq!(types(&events), vec!["auth_success", "initial_posts", "online_users", "presence"]);

  let success = &events[0]["data"];
  assert_eq!(success["username"], "alice");
  assert_eq!(success["is_new"], true);
  assert_eq!(success["session_id"].as_str().unwrap().len(), 16);
  assert_eq!(events[2]["data"]["users"][0]["username"], "alice");
  assert_eq!(events[3]["data"]["online"], true);
}

#[tokio::test]
async fn login_omits_session_id_and_second_connection_is_not_announced() {
  let state = state().await;
  let mut first = Client::connect(&state).await;
  let session_id = first.register("alice").await;

  let mut second = Client::connect(&state).await;
  second.send(json!({ "type": "authenticate", "data": { "session_id": session_id } })).await;

  let events = second.drain();
  assert_eq!(types(&events), vec!["auth_success", "initial_posts", "online_users"]);
  assert!(events[0]["data"].get("session_id").is_none());
  assert_eq!(events[0]["data"]["is_new"], false);
  assert!(first.drain().is_empty());
}

#[tokio::test]
async fn unknown_session_id_is_an_auth_error() {
  let state = state().await;
  let mut client = Client::connect(&state).await;
  client
    .send(json!({ "type": "authenticate", "data": { "session_id": "0000000000000000" } }))
    .await;

  let events = client.drain();
  assert_eq!(types(&events), vec!["auth_error"]);
  assert!(client.session.user().is_none());
}

#[tokio::test]
async fn duplicate_username_is_rejected_and_first_account_still_works() {
  let state = state().await;
  let mut first = Client::connect(&state).await;
  let session_id = first.register("alice").await;

  let mut second = Client::connect(&state).await;
  second.send(json!({ "type": "register", "data": { "username": "alice" } })).await;
  let events = second.drain();
  assert_eq!(types(&events), vec!["register_error"]);
  assert_eq!(events[0]["data"]["code"], "username_taken");
  assert_eq!(events[0]["data"]["retryable"], false);

  // The rejected connection can still log in as the original alice.
  second.send(json!({ "type": "authenticate", "data": { "session_id": session_id } })).await;
  assert_eq!(find(&second.drain(), "auth_success")["data"]["username"], "alice");
}

#[tokio::test]
async fn actions_before_authentication_are_refused() {
  let state = state().await;
  let mut client = Client::connect(&state).await;

  client.send(json!({ "type": "new_post", "data": { "content": "hi" } })).await;
  let events = client.drain();
  assert_eq!(types(&events), vec!["error"]);
  assert_eq!(events[0]["data"]["code"], "not_authenticated");
  assert!(state.store.recent_posts(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_frames_get_invalid_input() {
  let state = state().await;
  let mut client = Client::connect(&state).await;

  client.session.handle_text("{ not json").await;
  client.send(json!({ "type": "launch_rockets" })).await;

  let events = client.drain();
  assert_eq!(types(&events), vec!["error", "error"]);
  assert!(events.iter().all(|e| e["data"]["code"] == "invalid_input"));
}

// ── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_reaches_every_connection_and_is_stored_once() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let mut bob = Client::connect(&state).await;
  alice.register("alice").await;
  bob.register("bob").await;
  alice.drain();

  alice.send(json!({ "type": "new_post", "data": { "content": "hello" } })).await;

  for client in [&mut alice, &mut bob] {
    let events = client.drain();
    assert_eq!(types(&events), vec!["new_post"]);
    assert_eq!(events[0]["data"]["content"], "hello");
    assert_eq!(events[0]["data"]["author"]["username"], "alice");
  }
  assert_eq!(state.store.recent_posts(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unauthenticated_connections_still_see_public_events() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let mut lurker = Client::connect(&state).await;
  alice.register("alice").await;
  lurker.drain();

  alice.send(json!({ "type": "new_post", "data": { "content": "hi all" } })).await;
  assert_eq!(types(&lurker.drain()), vec!["new_post"]);
}

#[tokio::test]
async fn overlong_post_is_rejected_without_broadcast() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;

  let long = "x".repeat(141);
  alice.send(json!({ "type": "new_post", "data": { "content": long } })).await;
  let events = alice.drain();
  assert_eq!(types(&events), vec!["error"]);
  assert_eq!(events[0]["data"]["code"], "invalid_input");
}

#[tokio::test]
async fn likes_count_once_per_user() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;
  alice.send(json!({ "type": "new_post", "data": { "content": "like me" } })).await;
  let post_id = find(&alice.drain(), "new_post")["data"]["post_id"].clone();

  for _ in 0..2 {
    alice.send(json!({ "type": "like_post", "data": { "post_id": post_id } })).await;
  }
  let events = alice.drain();
  assert_eq!(types(&events), vec!["post_liked", "post_liked"]);
  assert!(events.iter().all(|e| e["data"]["likes"] == 1));
  assert_eq!(events[0]["data"]["username"], "alice");
}

#[tokio::test]
async fn comment_on_unknown_post_is_not_found() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;

  alice
    .send(json!({
      "type": "comment",
      "data": { "post_id": uuid::Uuid::new_v4(), "content": "hm" }
    }))
    .await;
  let events = alice.drain();
  assert_eq!(events[0]["data"]["code"], "not_found");
}

#[tokio::test]
async fn double_vote_is_recorded_once() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let mut bob = Client::connect(&state).await;
  alice.register("alice").await;
  bob.register("bob").await;

  alice
    .send(json!({
      "type": "create_poll",
      "data": { "question": "tea or coffee?", "options": ["tea", "coffee"] }
    }))
    .await;
  let post = find(&alice.drain(), "new_post")["data"].clone();
  let poll_id = post["poll"]["poll_id"].clone();
  let tea = post["poll"]["options"][0]["option_id"].clone();
  bob.drain();

  for _ in 0..2 {
    bob
      .send(json!({ "type": "vote_poll", "data": { "poll_id": poll_id, "option_id": tea } }))
      .await;
  }

  let events = alice.drain();
  assert_eq!(types(&events), vec!["poll_updated", "poll_updated"]);
  for event in &events {
    assert_eq!(event["data"]["total_votes"], 1);
    assert_eq!(event["data"]["options"][0]["votes"], 1);
    assert_eq!(event["data"]["options"][1]["votes"], 0);
  }
}

// ── Direct messages and presence ────────────────────────────────────────────

#[tokio::test]
async fn message_to_offline_user_is_stored_but_not_replayed() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let alice_id = alice.register("alice").await;
  alice.session.close();

  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  bob
    .send(json!({ "type": "send_message", "data": { "recipient": "alice", "content": "psst" } }))
    .await;
  let events = bob.drain();
  assert_eq!(types(&events), vec!["message_sent"]);
  assert_eq!(events[0]["data"]["recipient"], "alice");

  let mut alice = Client::connect(&state).await;
  alice.send(json!({ "type": "authenticate", "data": { "session_id": alice_id } })).await;
  let welcome = alice.drain();
  assert!(!types(&welcome).contains(&"new_message"));

  alice.send(json!({ "type": "get_messages", "data": {} })).await;
  let events = alice.drain();
  assert_eq!(types(&events), vec!["messages"]);
  assert_eq!(events[0]["data"]["messages"][0]["content"], "psst");
  assert_eq!(events[0]["data"]["messages"][0]["sender"], "bob");
}

#[tokio::test]
async fn message_reaches_every_connection_of_the_recipient_only() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let alice_id = alice.register("alice").await;
  let mut alice_phone = Client::connect(&state).await;
  alice_phone
    .send(json!({ "type": "authenticate", "data": { "session_id": alice_id } }))
    .await;
  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  let mut carol = Client::connect(&state).await;
  carol.register("carol").await;
  for c in [&mut alice, &mut alice_phone, &mut bob, &mut carol] {
    c.drain();
  }

  bob
    .send(json!({ "type": "send_message", "data": { "recipient": "alice", "content": "hi" } }))
    .await;

  assert_eq!(types(&alice.drain()), vec!["new_message"]);
  assert_eq!(types(&alice_phone.drain()), vec!["new_message"]);
  assert_eq!(types(&bob.drain()), vec!["message_sent"]);
  assert!(carol.drain().is_empty());
}

#[tokio::test]
async fn messages_to_unknown_users_or_self_are_rejected() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;

  alice
    .send(json!({ "type": "send_message", "data": { "recipient": "ghost", "content": "boo" } }))
    .await;
  alice
    .send(json!({ "type": "send_message", "data": { "recipient": "alice", "content": "me" } }))
    .await;

  let events = alice.drain();
  assert_eq!(events[0]["data"]["code"], "not_found");
  assert_eq!(events[1]["data"]["code"], "invalid_input");
}

#[tokio::test]
async fn offline_is_announced_only_when_last_connection_closes() {
  let state = state().await;
  let mut alice = Client::connect(&state).await;
  let alice_id = alice.register("alice").await;
  let mut alice_tab = Client::connect(&state).await;
  alice_tab
    .send(json!({ "type": "authenticate", "data": { "session_id": alice_id } }))
    .await;
  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  bob.drain();

  alice.session.close();
  assert!(bob.drain().is_empty());

  alice_tab.session.close();
  let events = bob.drain();
  assert_eq!(types(&events), vec!["presence"]);
  assert_eq!(events[0]["data"]["online"], false);
  assert_eq!(events[0]["data"]["user"]["username"], "alice");
}

async fn with_grace(ms: u64) -> AppState<SqliteStore> {
  state_with(ServerConfig { presence_grace_ms: ms, ..ServerConfig::default() }).await
}

fn presence_flags(events: &[Value]) -> Vec<bool> {
  events
    .iter()
    .filter(|e| e["type"] == "presence")
    .map(|e| e["data"]["online"].as_bool().unwrap())
    .collect()
}

#[tokio::test]
async fn offline_waits_for_the_grace_period() {
  let state = with_grace(100).await;
  let mut alice = Client::connect(&state).await;
  alice.register("alice").await;
  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  bob.drain();

  alice.session.close();
  assert!(bob.drain().is_empty());

  tokio::time::sleep(Duration::from_millis(300)).await;
  assert_eq!(presence_flags(&bob.drain()), vec![false]);
}

#[tokio::test]
async fn reconnect_within_grace_is_silent() {
  let state = with_grace(200).await;
  let mut alice = Client::connect(&state).await;
  let alice_id = alice.register("alice").await;
  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  bob.drain();

  alice.session.close();
  tokio::time::sleep(Duration::from_millis(50)).await;
  let mut again = Client::connect(&state).await;
  again.send(json!({ "type": "authenticate", "data": { "session_id": alice_id } })).await;
  assert!(presence_flags(&again.drain()).is_empty());

  tokio::time::sleep(Duration::from_millis(400)).await;
  assert!(presence_flags(&bob.drain()).is_empty());
  assert!(state.hub.is_online(&again.session.user().unwrap().id));
}

#[tokio::test]
async fn leaving_twice_within_grace_announces_offline_once() {
  let state = with_grace(200).await;
  let mut alice = Client::connect(&state).await;
  let alice_id = alice.register("alice").await;
  let mut bob = Client::connect(&state).await;
  bob.register("bob").await;
  bob.drain();

  alice.session.close();
  tokio::time::sleep(Duration::from_millis(50)).await;
  let mut again = Client::connect(&state).await;
  again.send(json!({ "type": "authenticate", "data": { "session_id": alice_id } })).await;
  tokio::time::sleep(Duration::from_millis(50)).await;
  again.session.close();

  tokio::time::sleep(Duration::from_millis(500)).await;
  assert_eq!(presence_flags(&bob.drain()), vec![false]);
}
