//! Router tests against an in-memory store and in-process collaborators.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use stash_core::{
  OwnerId,
  run::{RunStats, TriggerType},
  source::{
    Credential, EnrichedPost, Enrichment, EnrichmentSource, PageRequest,
    PostSource, RawPost, SourceError, SourcePage,
  },
  store::BookmarkStore,
};
use stash_store_sqlite::SqliteStore;
use stash_sync::{RetryPolicy, SyncConfig, Syncer};
use tower::ServiceExt as _;

use crate::{AppState, OWNER_HEADER, api_router};

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// Serves the same single page on every fetch.
struct OnePage(Vec<RawPost>);

impl PostSource for OnePage {
  async fn fetch(
    &self,
    credential: Credential,
    _request: PageRequest,
  ) -> Result<SourcePage, SourceError> {
    if credential.access_token == "revoked" {
      return Err(SourceError::Unauthorized("token revoked".into()));
    }
    Ok(SourcePage { posts: self.0.clone(), next_token: None })
  }
}

#[derive(Default)]
struct Known(HashMap<String, Enrichment>);

impl EnrichmentSource for Known {
  async fn fetch(&self, _author: String, post_id: String) -> Result<Enrichment, SourceError> {
    self.0.get(&post_id).cloned().ok_or(SourceError::NotFound)
  }
}

// ─── Builders ────────────────────────────────────────────────────────────────

type TestState = AppState<SqliteStore, OnePage, Known>;

fn raw(id: &str) -> RawPost {
  RawPost {
    post_id:       id.into(),
    author:        "someone".into(),
    author_name:   None,
    author_avatar: None,
    text:          format!("post {id}"),
    url:           None,
    created_at:    None,
    is_reply:      false,
    quoted:        None,
    retweeted:     None,
    media:         Vec::new(),
    links:         Vec::new(),
    raw:           Value::Null,
  }
}

fn enriched(id: &str) -> Enrichment {
  Enrichment {
    post:     EnrichedPost {
      post_id:       id.into(),
      author:        "someone".into(),
      author_name:   Some("Some One".into()),
      author_avatar: None,
      text:          format!("post {id}"),
      url:           Some(format!("https://x.com/someone/status/{id}")),
      created_at:    None,
      is_reply:      false,
      quoted:        None,
    },
    media:    Vec::new(),
    article:  None,
    external: None,
  }
}

async fn make_state(page: Vec<RawPost>, cooldown: Duration) -> Arc<TestState> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let known = Known(
    ["1", "2", "3"]
      .into_iter()
      .map(|id| (id.to_owned(), enriched(id)))
      .collect(),
  );
  let config = SyncConfig {
    cooldown,
    item_delay: Duration::ZERO,
    page_size: 10,
    heartbeat: Duration::from_secs(60),
    retry: RetryPolicy { attempts: 1, delay: Duration::ZERO },
  };
  let syncer = Syncer::new(
    Arc::new(store),
    Arc::new(OnePage(page)),
    Arc::new(known),
    config,
  );
  Arc::new(AppState::new(syncer))
}

fn app(state: &Arc<TestState>) -> Router { api_router(Arc::clone(state)) }

async fn send(
  state: &Arc<TestState>,
  method: &str,
  uri: &str,
  owner: Option<&str>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(owner) = owner {
    builder = builder.header(OWNER_HEADER, owner);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  app(state).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn add(state: &Arc<TestState>, owner: &str, id: &str) -> Response {
  let url = format!("https://x.com/someone/status/{id}");
  send(state, "POST", "/posts", Some(owner), Some(json!({ "url": url }))).await
}

// ── Owner ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_owner_are_unauthorized() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  let resp = send(&state, "GET", "/feed", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(json_body(resp).await["error"].as_str().unwrap().contains(OWNER_HEADER));
}

// ── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_post_reports_added_then_already_exists() {
  let state = make_state(Vec::new(), Duration::ZERO).await;

  let resp = add(&state, "alice", "1").await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(json_body(resp).await, json!({ "status": "added", "postId": "1" }));

  let resp = add(&state, "alice", "1").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["status"], "already_exists");

  // Another owner gets an independent copy.
  assert_eq!(add(&state, "bob", "1").await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn add_post_rejects_bad_urls_and_unknown_posts() {
  let state = make_state(Vec::new(), Duration::ZERO).await;

  let resp = send(
    &state,
    "POST",
    "/posts",
    Some("alice"),
    Some(json!({ "url": "https://example.com/nope" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  assert_eq!(add(&state, "alice", "404").await.status(), StatusCode::NOT_FOUND);
}

// ── Feed & read status ──────────────────────────────────────────────────────

#[tokio::test]
async fn feed_lists_posts_and_honours_unread_filter() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  add(&state, "alice", "1").await;
  add(&state, "alice", "2").await;

  let feed = json_body(send(&state, "GET", "/feed", Some("alice"), None).await).await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 2);
  assert_eq!(feed["has_more"], false);

  let resp = send(&state, "PUT", "/posts/1/read", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let feed = json_body(
    send(&state, "GET", "/feed?unread_only=true", Some("alice"), None).await,
  )
  .await;
  let items = feed["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["post_id"], "2");

  let resp = send(&state, "DELETE", "/posts/1/read", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let feed = json_body(
    send(&state, "GET", "/feed?unread_only=true", Some("alice"), None).await,
  )
  .await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 2);

  // Bob sees none of it.
  let feed = json_body(send(&state, "GET", "/feed", Some("bob"), None).await).await;
  assert!(feed["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feed_limit_pages_results() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  for id in ["1", "2", "3"] {
    add(&state, "alice", id).await;
  }

  let feed = json_body(
    send(&state, "GET", "/feed?limit=2", Some("alice"), None).await,
  )
  .await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 2);
  assert_eq!(feed["has_more"], true);

  let feed = json_body(
    send(&state, "GET", "/feed?limit=2&offset=2", Some("alice"), None).await,
  )
  .await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 1);
  assert_eq!(feed["has_more"], false);
}

#[tokio::test]
async fn marking_a_missing_post_read_is_not_found() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  let resp = send(&state, "PUT", "/posts/9/read", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tags_are_normalised_counted_and_removed() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  add(&state, "alice", "1").await;

  let tag = |t: &str| Some(json!({ "tag": t }));
  let resp = send(&state, "POST", "/posts/1/tags", Some("alice"), tag("  Rust ")).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let resp = send(&state, "POST", "/posts/1/tags", Some("alice"), tag("rust")).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let tags = json_body(send(&state, "GET", "/tags", Some("alice"), None).await).await;
  assert_eq!(tags, json!([{ "tag": "rust", "count": 1 }]));

  let feed = json_body(
    send(&state, "GET", "/feed?tag=RUST", Some("alice"), None).await,
  )
  .await;
  assert_eq!(feed["items"][0]["tags"], json!(["rust"]));

  let resp = send(&state, "DELETE", "/posts/1/tags/RUST", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let resp = send(&state, "DELETE", "/posts/1/tags/rust", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_errors() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  add(&state, "alice", "1").await;

  let tag = |t: &str| Some(json!({ "tag": t }));
  let resp = send(&state, "POST", "/posts/1/tags", Some("alice"), tag("  ")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&state, "POST", "/posts/9/tags", Some("alice"), tag("x")).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Sync ────────────────────────────────────────────────────────────────────

async fn stream(state: &Arc<TestState>, owner: &str, token: Option<&str>) -> Response {
  let mut builder = Request::builder()
    .uri("/sync/stream?full=true")
    .header(OWNER_HEADER, owner);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  app(state).oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

async fn text_body(resp: Response) -> String {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn sync_stream_emits_events_until_complete() {
  let state = make_state(vec![raw("1"), raw("2")], Duration::ZERO).await;

  let resp = stream(&state, "alice", Some("token")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
    "text/event-stream"
  );

  let body = text_body(resp).await;
  let names: Vec<&str> = body
    .lines()
    .filter_map(|l| l.strip_prefix("event: "))
    .filter(|n| *n != "ping")
    .collect();
  assert_eq!(names, ["start", "page", "processing", "processing", "complete"]);
  assert!(body.contains(r#""type":"complete""#));

  let runs = json_body(send(&state, "GET", "/sync/runs", Some("alice"), None).await).await;
  let runs = runs.as_array().unwrap();
  assert_eq!(runs.len(), 1);
  assert_eq!(runs[0]["status"], "completed");
  assert_eq!(runs[0]["newCount"], 2);

  let feed = json_body(send(&state, "GET", "/feed", Some("alice"), None).await).await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn sync_stream_reports_source_failure_as_error_event() {
  let state = make_state(vec![raw("1")], Duration::ZERO).await;

  let body = text_body(stream(&state, "alice", Some("revoked")).await).await;
  assert!(body.contains("event: error"));
  assert!(body.contains("token revoked"));

  let runs = json_body(send(&state, "GET", "/sync/runs", Some("alice"), None).await).await;
  assert_eq!(runs[0]["status"], "failed");
}

#[tokio::test]
async fn sync_stream_requires_bearer_token() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  let resp = stream(&state, "alice", None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_stream_rejects_zero_page_cap() {
  let state = make_state(vec![raw("1")], Duration::from_secs(3600)).await;
  let req = Request::builder()
    .uri("/sync/stream?max_pages=0")
    .header(OWNER_HEADER, "alice")
    .header(header::AUTHORIZATION, "Bearer token")
    .body(Body::empty())
    .unwrap();
  let resp = app(&state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  // No run was recorded, so the owner is not in cooldown.
  let status = json_body(send(&state, "GET", "/sync/status", Some("alice"), None).await).await;
  assert_eq!(status["canSync"], true);
  let runs = json_body(send(&state, "GET", "/sync/runs", Some("alice"), None).await).await;
  assert!(runs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sync_stream_is_rejected_during_cooldown() {
  let state = make_state(vec![raw("1")], Duration::from_secs(3600)).await;
  let run = state
    .store()
    .start_run(OwnerId::new("alice"), TriggerType::Manual)
    .await
    .unwrap();
  state.store().complete_run(run.run_id, RunStats::default()).await.unwrap();

  let resp = stream(&state, "alice", Some("token")).await;
  assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
  let body = json_body(resp).await;
  assert_eq!(body["canSync"], false);
  assert!(body["remainingMs"].as_u64().unwrap() > 0);
  assert!(body["lastSyncAt"].is_string());

  let status = json_body(send(&state, "GET", "/sync/status", Some("alice"), None).await).await;
  assert_eq!(status["canSync"], false);

  // Other owners are unaffected.
  let status = json_body(send(&state, "GET", "/sync/status", Some("bob"), None).await).await;
  assert_eq!(status, json!({ "canSync": true, "remainingMs": 0, "lastSyncAt": null }));
}

// ── Owner data ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_data_removes_only_the_owners_rows() {
  let state = make_state(Vec::new(), Duration::ZERO).await;
  add(&state, "alice", "1").await;
  add(&state, "alice", "2").await;
  add(&state, "bob", "1").await;
  send(&state, "PUT", "/posts/1/read", Some("alice"), None).await;

  let resp = send(&state, "DELETE", "/data", Some("alice"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let deleted = json_body(resp).await;
  assert_eq!(deleted["posts"], 2);
  assert_eq!(deleted["read_status"], 1);

  let feed = json_body(send(&state, "GET", "/feed", Some("alice"), None).await).await;
  assert!(feed["items"].as_array().unwrap().is_empty());
  let feed = json_body(send(&state, "GET", "/feed", Some("bob"), None).await).await;
  assert_eq!(feed["items"].as_array().unwrap().len(), 1);
}
