//! Integration tests for `SqliteStore` against an in-memory database.

use stash_core::{
  OwnerId,
  link::{LinkType, NewLink},
  media::{Media, MediaKind},
  post::{Category, NewPost},
  run::{RunStats, RunStatus, TriggerType},
  snapshot::{EmbeddedPost, Snapshot},
  store::{BookmarkStore, FeedQuery, FeedStore, InsertOutcome},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn alice() -> OwnerId { OwnerId::new("alice") }

fn bob() -> OwnerId { OwnerId::new("bob") }

fn post(owner: OwnerId, id: &str) -> NewPost {
  NewPost::new(owner, id, "someone", format!("post {id}"))
}

fn photo(owner: OwnerId, post_id: &str, media_id: &str) -> Media {
  Media {
    owner,
    media_id:    media_id.into(),
    post_id:     post_id.into(),
    kind:        MediaKind::Photo,
    url:         format!("https://pbs.example/{media_id}.jpg"),
    preview_url: None,
    width:       Some(1200),
    height:      Some(800),
    duration_ms: None,
  }
}

fn link(owner: OwnerId, post_id: &str, url: &str) -> NewLink {
  NewLink {
    owner,
    post_id:             post_id.into(),
    url:                 url.into(),
    expanded_url:        None,
    domain:              None,
    link_type:           LinkType::External,
    preview_title:       None,
    preview_description: None,
    preview_image_url:   None,
    content:             None,
  }
}

fn page(limit: usize) -> FeedQuery { FeedQuery { limit, ..FeedQuery::default() } }

// ─── Insert-or-skip ──────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_post_then_duplicate_is_skipped() {
  let s = store().await;

  let first = s.insert_post(post(alice(), "1")).await.unwrap();
  assert_eq!(first, InsertOutcome::Inserted);

  let mut again = post(alice(), "1");
  again.text = "changed".into();
  let second = s.insert_post(again).await.unwrap();
  assert_eq!(second, InsertOutcome::Skipped);

  // The original row is never overwritten.
  let stored = s.get_post(alice(), "1".into()).await.unwrap().unwrap();
  assert_eq!(stored.text, "post 1");
}

#[tokio::test]
async fn same_post_id_is_independent_per_owner() {
  let s = store().await;

  assert!(s.insert_post(post(alice(), "1")).await.unwrap().is_inserted());
  assert!(s.insert_post(post(bob(), "1")).await.unwrap().is_inserted());

  assert!(s.post_exists(alice(), "1".into()).await.unwrap());
  assert!(s.post_exists(bob(), "1".into()).await.unwrap());
  assert!(!s.post_exists(OwnerId::new("carol"), "1".into()).await.unwrap());
}

#[tokio::test]
async fn concurrent_inserts_of_one_key_insert_once() {
  let s = store().await;

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { s.insert_post(post(alice(), "race")).await })
    })
    .collect();

  let mut inserted = 0;
  for h in handles {
    if h.await.unwrap().unwrap().is_inserted() {
      inserted += 1;
    }
  }
  assert_eq!(inserted, 1);
  assert_eq!(s.count_rows("posts", alice()).await.unwrap(), 1);
}

#[tokio::test]
async fn post_fields_round_trip() {
  let s = store().await;

  let mut p = post(alice(), "42");
  p.author_name = Some("Some One".into());
  p.category = Category::Photo;
  p.is_quote = true;
  p.snapshot = Snapshot::Quote(EmbeddedPost {
    post_id:       "7".into(),
    author:        "quoted".into(),
    author_name:   None,
    author_avatar: None,
    text:          "inner".into(),
    url:           Some("https://x.com/quoted/status/7".into()),
    created_at:    None,
    media:         Vec::new(),
    article:       None,
    external:      None,
  });
  p.raw = Some(serde_json::json!({ "id": "42" }));
  s.insert_post(p.clone()).await.unwrap();

  let got = s.get_post(alice(), "42".into()).await.unwrap().unwrap();
  assert_eq!(got.author_name.as_deref(), Some("Some One"));
  assert_eq!(got.category, Category::Photo);
  assert!(got.is_quote);
  assert_eq!(got.snapshot, p.snapshot);
  assert_eq!(got.raw, p.raw);
  assert_eq!(got.source_url, "https://x.com/someone/status/42");
}

#[tokio::test]
async fn media_and_links_are_insert_or_skip() {
  let s = store().await;
  s.insert_post(post(alice(), "1")).await.unwrap();

  assert!(s.insert_media(photo(alice(), "1", "m1")).await.unwrap().is_inserted());
  assert!(!s.insert_media(photo(alice(), "1", "m1")).await.unwrap().is_inserted());

  let url = "https://example.com/a";
  assert!(s.insert_link(link(alice(), "1", url)).await.unwrap().is_inserted());
  assert!(!s.insert_link(link(alice(), "1", url)).await.unwrap().is_inserted());

  let media = s.media_for_posts(alice(), vec!["1".into()]).await.unwrap();
  assert_eq!(media.len(), 1);
  assert_eq!(media[0].width, Some(1200));
  let links = s.links_for_posts(alice(), vec!["1".into()]).await.unwrap();
  assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn links_come_back_in_insertion_order() {
  let s = store().await;
  s.insert_post(post(alice(), "1")).await.unwrap();
  for u in ["https://c.example", "https://a.example", "https://b.example"] {
    s.insert_link(link(alice(), "1", u)).await.unwrap();
  }

  let links = s.links_for_posts(alice(), vec!["1".into()]).await.unwrap();
  let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
  assert_eq!(urls, ["https://c.example", "https://a.example", "https://b.example"]);
}

// ─── Tags & read status ──────────────────────────────────────────────────────

#[tokio::test]
async fn tags_are_normalised_and_counted() {
  let s = store().await;
  s.insert_post(post(alice(), "1")).await.unwrap();
  s.insert_post(post(alice(), "2")).await.unwrap();

  assert!(s.add_tag(alice(), "1".into(), " Rust ".into()).await.unwrap().is_inserted());
  assert!(!s.add_tag(alice(), "1".into(), "rust".into()).await.unwrap().is_inserted());
  s.add_tag(alice(), "2".into(), "rust".into()).await.unwrap();
  s.add_tag(alice(), "2".into(), "later".into()).await.unwrap();

  let tags = s.list_tags(alice()).await.unwrap();
  assert_eq!(tags[0].tag, "rust");
  assert_eq!(tags[0].count, 2);
  assert_eq!(tags[1].tag, "later");

  assert!(s.remove_tag(alice(), "2".into(), "LATER".into()).await.unwrap());
  assert!(!s.remove_tag(alice(), "2".into(), "later".into()).await.unwrap());
}

#[tokio::test]
async fn tagging_a_missing_post_is_an_error() {
  let s = store().await;
  let err = s
    .add_tag(alice(), "nope".into(), "rust".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PostNotFound { .. }));

  let err = s.add_tag(alice(), "nope".into(), "   ".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(stash_core::Error::EmptyTag)));
}

#[tokio::test]
async fn read_status_toggles() {
  let s = store().await;
  s.insert_post(post(alice(), "1")).await.unwrap();

  assert!(s.mark_read(alice(), "1".into()).await.unwrap().is_inserted());
  assert!(!s.mark_read(alice(), "1".into()).await.unwrap().is_inserted());
  assert_eq!(
    s.read_post_ids(alice(), vec!["1".into(), "2".into()]).await.unwrap(),
    vec!["1".to_owned()]
  );

  assert!(s.mark_unread(alice(), "1".into()).await.unwrap());
  assert!(s.read_post_ids(alice(), vec!["1".into()]).await.unwrap().is_empty());

  let err = s.mark_read(alice(), "2".into()).await.unwrap_err();
  assert!(matches!(err, Error::PostNotFound { .. }));
}

// ─── Runs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_lifecycle() {
  let s = store().await;

  assert!(s.latest_completed_run(alice()).await.unwrap().is_none());

  let run = s.start_run(alice(), TriggerType::Manual).await.unwrap();
  assert_eq!(run.status, RunStatus::Running);
  // A running run is not a completed one.
  assert!(s.latest_completed_run(alice()).await.unwrap().is_none());

  let stats = RunStats { total: 5, new: 3, duplicates: 2 };
  s.complete_run(run.run_id, stats).await.unwrap();

  let latest = s.latest_completed_run(alice()).await.unwrap().unwrap();
  assert_eq!(latest.run_id, run.run_id);
  assert_eq!(latest.status, RunStatus::Completed);
  assert_eq!(latest.stats(), stats);
  assert!(latest.completed_at.is_some());
  assert!(s.latest_completed_run(bob()).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_run_keeps_message_and_is_not_completed() {
  let s = store().await;

  let run = s.start_run(alice(), TriggerType::Scheduled).await.unwrap();
  let stats = RunStats { total: 1, new: 1, duplicates: 0 };
  s.fail_run(run.run_id, stats, "upstream said no".into())
    .await
    .unwrap();

  assert!(s.latest_completed_run(alice()).await.unwrap().is_none());
  let runs = s.list_runs(alice(), 10).await.unwrap();
  assert_eq!(runs.len(), 1);
  assert_eq!(runs[0].status, RunStatus::Failed);
  assert_eq!(runs[0].trigger, TriggerType::Scheduled);
  assert_eq!(runs[0].error_message.as_deref(), Some("upstream said no"));
  assert_eq!(runs[0].new_count, 1);
}

#[tokio::test]
async fn finishing_a_run_twice_is_rejected() {
  let s = store().await;
  let run = s.start_run(alice(), TriggerType::Manual).await.unwrap();
  s.complete_run(run.run_id, RunStats::default()).await.unwrap();

  let err = s
    .complete_run(run.run_id, RunStats::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RunAlreadyFinished(id) if id == run.run_id));

  let missing = Uuid::new_v4();
  let err = s
    .fail_run(missing, RunStats::default(), "x".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RunNotFound(id) if id == missing));
}

// ─── Feed reads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_posts_pages_newest_first() {
  let s = store().await;
  for id in ["1", "2", "3"] {
    s.insert_post(post(alice(), id)).await.unwrap();
  }
  s.insert_post(post(bob(), "9")).await.unwrap();

  let first = s.list_posts(alice(), page(2)).await.unwrap();
  let ids: Vec<_> = first.iter().map(|p| p.post_id.as_str()).collect();
  assert_eq!(ids, ["3", "2"]);

  let rest = s
    .list_posts(alice(), FeedQuery { offset: 2, ..page(2) })
    .await
    .unwrap();
  assert_eq!(rest.len(), 1);
  assert_eq!(rest[0].post_id, "1");
}

#[tokio::test]
async fn list_posts_filters() {
  let s = store().await;
  let mut p = post(alice(), "1");
  p.category = Category::Video;
  s.insert_post(p).await.unwrap();
  s.insert_post(post(alice(), "2")).await.unwrap();
  s.insert_post(post(alice(), "3")).await.unwrap();
  s.mark_read(alice(), "2".into()).await.unwrap();
  s.add_tag(alice(), "3".into(), "keep".into()).await.unwrap();

  let videos = s
    .list_posts(alice(), FeedQuery { category: Some(Category::Video), ..page(10) })
    .await
    .unwrap();
  assert_eq!(videos.len(), 1);
  assert_eq!(videos[0].post_id, "1");

  let unread = s
    .list_posts(alice(), FeedQuery { unread_only: true, ..page(10) })
    .await
    .unwrap();
  assert!(unread.iter().all(|p| p.post_id != "2"));
  assert_eq!(unread.len(), 2);

  let tagged = s
    .list_posts(alice(), FeedQuery { tag: Some("keep".into()), ..page(10) })
    .await
    .unwrap();
  assert_eq!(tagged.len(), 1);
  assert_eq!(tagged[0].post_id, "3");
}

#[tokio::test]
async fn batched_reads_are_owner_scoped() {
  let s = store().await;
  s.insert_post(post(alice(), "1")).await.unwrap();
  s.insert_post(post(bob(), "1")).await.unwrap();
  s.insert_media(photo(bob(), "1", "m1")).await.unwrap();

  let posts = s.posts_by_ids(alice(), vec!["1".into(), "404".into()]).await.unwrap();
  assert_eq!(posts.len(), 1);
  assert_eq!(posts[0].owner, alice());
  assert!(s.media_for_posts(alice(), vec!["1".into()]).await.unwrap().is_empty());
  assert!(s.posts_by_ids(alice(), Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn posts_quoting_finds_reverse_references() {
  let s = store().await;
  s.insert_post(post(alice(), "inner")).await.unwrap();
  let mut outer = post(alice(), "outer");
  outer.is_quote = true;
  outer.quoted_post_id = Some("inner".into());
  s.insert_post(outer).await.unwrap();

  let quoting = s.posts_quoting(alice(), vec!["inner".into()]).await.unwrap();
  assert_eq!(quoting.len(), 1);
  assert_eq!(quoting[0].post_id, "outer");
  assert!(s.posts_quoting(bob(), vec!["inner".into()]).await.unwrap().is_empty());
}

// ─── Bulk ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_owner_leaves_other_owners_untouched() {
  let s = store().await;
  for owner in [alice(), bob()] {
    s.insert_post(post(owner.clone(), "1")).await.unwrap();
    s.insert_media(photo(owner.clone(), "1", "m1")).await.unwrap();
    s.insert_link(link(owner.clone(), "1", "https://e.example")).await.unwrap();
    s.add_tag(owner.clone(), "1".into(), "t".into()).await.unwrap();
    s.mark_read(owner.clone(), "1".into()).await.unwrap();
    s.start_run(owner, TriggerType::Manual).await.unwrap();
  }

  let deleted = s.delete_owner(alice()).await.unwrap();
  assert_eq!(deleted.posts, 1);
  assert_eq!(deleted.media, 1);
  assert_eq!(deleted.links, 1);
  assert_eq!(deleted.tags, 1);
  assert_eq!(deleted.read_status, 1);
  assert_eq!(deleted.runs, 1);

  assert!(!s.post_exists(alice(), "1".into()).await.unwrap());
  assert!(s.post_exists(bob(), "1".into()).await.unwrap());
  for table in ["media", "links", "tags", "read_status", "sync_runs"] {
    assert_eq!(s.count_rows(table, bob()).await.unwrap(), 1, "{table}");
    assert_eq!(s.count_rows(table, alice()).await.unwrap(), 0, "{table}");
  }
}
