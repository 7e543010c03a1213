use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
  response::Response,
};
use chirp_core::{
  content::{NewComment, NewPost},
  store::{ContentStore, SessionStore},
  user::{NewUser, SessionId, User},
};
use chirp_store_sqlite::SqliteStore;
use serde_json::Value;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.unwrap())
}

async fn alice(store: &SqliteStore) -> User {
  store
    .create_user(NewUser {
      session_id: SessionId::from_number(1234).unwrap(),
      username:   "alice".into(),
      avatar_url: "https://avatars.example/alice.png".into(),
    })
    .await
    .unwrap()
}

async fn get(store: Arc<SqliteStore>, uri: &str) -> Response {
  let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
  api_router(store).oneshot(req).await.unwrap()
}

async fn json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

// ── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_posts_is_newest_first_and_honours_limit() {
  let store = store().await;
  let alice = alice(&store).await;
  for i in 0..3 {
    store
      .append_post(NewPost::text(alice.id.clone(), format!("post {i}")))
      .await
      .unwrap();
  }

  let resp = get(store.clone(), "/posts?limit=2").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json(resp).await;
  let contents: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["content"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(contents, vec!["post 2", "post 1"]);

  let all = json(get(store, "/posts").await).await;
  assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn list_posts_on_empty_feed_is_empty_array() {
  let resp = get(store().await, "/posts").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json(resp).await, Value::Array(vec![]));
}

#[tokio::test]
async fn get_post_includes_comments() {
  let store = store().await;
  let alice = alice(&store).await;
  let post = store
    .append_post(NewPost::text(alice.id.clone(), "hello"))
    .await
    .unwrap();
  store
    .append_comment(NewComment {
      post_id:   post.post_id,
      author_id: alice.id,
      content:   "me again".into(),
    })
    .await
    .unwrap();

  let resp = get(store, &format!("/posts/{}", post.post_id)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json(resp).await;
  assert_eq!(body["content"], "hello");
  assert_eq!(body["author"]["username"], "alice");
  assert_eq!(body["comments"][0]["content"], "me again");
}

#[tokio::test]
async fn get_unknown_post_is_404() {
  let resp = get(store().await, &format!("/posts/{}", Uuid::new_v4())).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(json(resp).await["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn malformed_post_id_is_rejected() {
  let resp = get(store().await, "/posts/not-a-uuid").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_profile_omits_session_id() {
  let store = store().await;
  let alice = alice(&store).await;

  let resp = get(store, "/users/alice").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json(resp).await;
  assert_eq!(body["username"], "alice");
  assert_eq!(body["avatar_url"], "https://avatars.example/alice.png");
  assert!(!body.to_string().contains(alice.id.as_str()));
}

#[tokio::test]
async fn unknown_user_is_404() {
  let resp = get(store().await, "/users/nobody").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
