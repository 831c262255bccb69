//! The sync orchestrator.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use stash_core::{
  OwnerId,
  post::parse_status_url,
  run::{RunStats, RunStatus, TriggerType},
  source::{Credential, EnrichmentSource, PageRequest, PostSource, RawPost},
  store::BookmarkStore,
};
use tokio::{
  sync::{mpsc, watch},
  task::JoinHandle,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
  Result, SyncError,
  config::SyncConfig,
  context::RunContext,
  cooldown::CooldownStatus,
  enrich::enrich_with_retry,
  event::{SyncEvent, SyncState},
  pipeline::{Ingested, Pipeline},
};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
  /// Walk every page instead of stopping at the first page with nothing
  /// new.
  pub full:      bool,
  /// Stop after this many pages. Must be at least 1.
  pub max_pages: Option<u32>,
  pub trigger:   TriggerType,
}

/// A started run. The run itself is detached: dropping the handle, or
/// either receiver, does not stop it.
#[derive(Debug)]
pub struct SyncHandle {
  pub run_id: Uuid,
  pub events: mpsc::UnboundedReceiver<SyncEvent>,
  pub state:  watch::Receiver<SyncState>,
  pub task:   JoinHandle<RunReport>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub run_id:              Uuid,
  pub status:              RunStatus,
  pub stats:               RunStats,
  pub enrichment_failures: u32,
  pub error:               Option<String>,
}

/// Result of adding a single post by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AddOutcome {
  Added { post_id: String },
  AlreadyExists { post_id: String },
}

// ─── Syncer ──────────────────────────────────────────────────────────────────

/// Runs syncs against a store and the two collaborators. Cheap to clone.
pub struct Syncer<S, P, E> {
  store:      Arc<S>,
  posts:      Arc<P>,
  enrichment: Arc<E>,
  config:     SyncConfig,
  active:     Arc<Mutex<HashSet<OwnerId>>>,
}

impl<S, P, E> Clone for Syncer<S, P, E> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      posts:      Arc::clone(&self.posts),
      enrichment: Arc::clone(&self.enrichment),
      config:     self.config,
      active:     Arc::clone(&self.active),
    }
  }
}

impl<S, P, E> Syncer<S, P, E>
where
  S: BookmarkStore + 'static,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  pub fn new(store: Arc<S>, posts: Arc<P>, enrichment: Arc<E>, config: SyncConfig) -> Self {
    Self {
      store,
      posts,
      enrichment,
      config,
      active: Arc::default(),
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn enrichment(&self) -> &Arc<E> { &self.enrichment }

  pub fn config(&self) -> &SyncConfig { &self.config }

  /// Whether `owner` may start a run now.
  pub async fn cooldown_status(&self, owner: &OwnerId) -> Result<CooldownStatus> {
    let latest = self
      .store
      .latest_completed_run(owner.clone())
      .await
      .map_err(SyncError::store)?;
    Ok(CooldownStatus::evaluate(
      latest.as_ref(),
      self.config.cooldown,
      Utc::now(),
    ))
  }

  /// Open a run and drive it in the background.
  ///
  /// Fails without creating a run when `max_pages` is zero, when the owner
  /// is in cooldown, or when the owner already has a run in flight in this
  /// process.
  pub async fn start(
    &self,
    owner: OwnerId,
    credential: Credential,
    options: SyncOptions,
  ) -> Result<SyncHandle> {
    // A run that may fetch nothing would still complete and start the
    // cooldown.
    if options.max_pages == Some(0) {
      return Err(SyncError::InvalidOptions("max_pages must be at least 1"));
    }
    let guard = ActiveRun::claim(&self.active, &owner)?;

    let cooldown = self.cooldown_status(&owner).await?;
    if !cooldown.can_sync {
      info!(%owner, remaining_ms = cooldown.remaining_ms, "sync rejected by cooldown");
      return Err(SyncError::Cooldown(cooldown));
    }

    let (state_tx, state_rx) = watch::channel(SyncState::Connecting);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let progress = Progress { events: events_tx, state: state_tx };

    let run = self
      .store
      .start_run(owner.clone(), options.trigger)
      .await
      .map_err(SyncError::store)?;
    let run_id = run.run_id;
    info!(%owner, %run_id, full = options.full, max_pages = ?options.max_pages, "sync started");
    progress.emit(SyncEvent::Start { sync_id: run_id });

    tokio::spawn(heartbeat(
      progress.events.clone(),
      state_rx.clone(),
      self.config.heartbeat,
    ));

    let this = self.clone();
    let task = tokio::spawn(async move {
      let _guard = guard;
      this.run(run_id, owner, credential, options, &progress).await
    });

    Ok(SyncHandle { run_id, events: events_rx, state: state_rx, task })
  }

  /// Add a single post by its status URL, resolving its quote or retweet the
  /// same way a sync does.
  pub async fn add_post(&self, owner: OwnerId, url: &str) -> Result<AddOutcome> {
    let address = parse_status_url(url)?;

    if self
      .store
      .post_exists(owner.clone(), address.post_id.clone())
      .await
      .map_err(SyncError::store)?
    {
      return Ok(AddOutcome::AlreadyExists { post_id: address.post_id });
    }

    let enrichment = enrich_with_retry(
      &*self.enrichment,
      &address.author,
      &address.post_id,
      self.config.retry,
    )
    .await?;

    let raw = RawPost {
      post_id:       address.post_id,
      author:        enrichment.post.author.clone(),
      author_name:   None,
      author_avatar: None,
      text:          enrichment.post.text.clone(),
      url:           enrichment.post.url.clone(),
      created_at:    enrichment.post.created_at,
      is_reply:      enrichment.post.is_reply,
      quoted:        None,
      retweeted:     None,
      media:         Vec::new(),
      links:         Vec::new(),
      raw:           serde_json::to_value(&enrichment).unwrap_or_default(),
    };

    let pipeline = self.pipeline();
    let mut ctx = RunContext::new(owner);
    let outcome = match pipeline.ingest(&mut ctx, raw, Some(enrichment)).await? {
      Ingested::New(item) => AddOutcome::Added { post_id: item.post_id },
      Ingested::Duplicate(item) => AddOutcome::AlreadyExists { post_id: item.post_id },
    };
    info!(owner = %ctx.owner, ?outcome, "manual add");
    Ok(outcome)
  }

  fn pipeline(&self) -> Pipeline<'_, S, E> {
    Pipeline {
      store:      &*self.store,
      enrichment: &*self.enrichment,
      retry:      self.config.retry,
    }
  }

  // ── Run ───────────────────────────────────────────────────────────────────

  async fn run(
    &self,
    run_id: Uuid,
    owner: OwnerId,
    credential: Credential,
    options: SyncOptions,
    progress: &Progress,
  ) -> RunReport {
    let mut ctx = RunContext::new(owner);
    match self.paginate(&mut ctx, credential, &options, progress).await {
      Ok(()) => match self.store.complete_run(run_id, ctx.stats).await {
        Ok(()) => {
          info!(
            owner = %ctx.owner,
            %run_id,
            total = ctx.stats.total,
            new = ctx.stats.new,
            duplicates = ctx.stats.duplicates,
            enrichment_failures = ctx.enrichment_failures,
            "sync completed"
          );
          progress.set(SyncState::Complete);
          progress.emit(SyncEvent::Complete {
            stats:               ctx.stats,
            enrichment_failures: ctx.enrichment_failures,
          });
          RunReport {
            run_id,
            status: RunStatus::Completed,
            stats: ctx.stats,
            enrichment_failures: ctx.enrichment_failures,
            error: None,
          }
        }
        Err(e) => self.fail(run_id, &ctx, SyncError::store(e), progress).await,
      },
      Err(e) => self.fail(run_id, &ctx, e, progress).await,
    }
  }

  async fn paginate(
    &self,
    ctx: &mut RunContext,
    credential: Credential,
    options: &SyncOptions,
    progress: &Progress,
  ) -> Result<()> {
    let pipeline = self.pipeline();
    let mut cursor = None;
    let mut page_number = 0u32;
    let mut first_item = true;

    loop {
      if options.max_pages.is_some_and(|max| page_number >= max) {
        debug!(owner = %ctx.owner, page_number, "page cap reached");
        break;
      }

      let request = PageRequest {
        max_results:      self.config.page_size,
        pagination_token: cursor.take(),
      };
      let page = self.posts.fetch(credential.clone(), request).await?;
      page_number += 1;

      let total = u32::try_from(page.posts.len()).unwrap_or(u32::MAX);
      progress.set(SyncState::Fetching { page: page_number });
      progress.emit(SyncEvent::Page {
        page_number,
        items_found: total,
        cursor: page.next_token.clone(),
      });

      let new_before = ctx.stats.new;
      for (i, raw) in page.posts.into_iter().enumerate() {
        if !first_item {
          tokio::time::sleep(self.config.item_delay).await;
        }
        first_item = false;

        let current = u32::try_from(i + 1).unwrap_or(u32::MAX);
        progress.set(SyncState::Processing { current, total });

        let item = match pipeline.ingest(ctx, raw, None).await? {
          Ingested::New(item) => item,
          Ingested::Duplicate(item) => {
            progress.emit(SyncEvent::Duplicate { post_id: item.post_id.clone() });
            item
          }
        };
        progress.emit(SyncEvent::Processing { current, total, item });
      }

      if !options.full && ctx.stats.new == new_before {
        debug!(owner = %ctx.owner, page_number, "nothing new on page, stopping");
        break;
      }
      match page.next_token {
        Some(next) => cursor = Some(next),
        None => break,
      }
    }
    Ok(())
  }

  async fn fail(
    &self,
    run_id: Uuid,
    ctx: &RunContext,
    err: SyncError,
    progress: &Progress,
  ) -> RunReport {
    let message = err.to_string();
    error!(owner = %ctx.owner, %run_id, error = %message, "sync failed");

    if let Err(e) = self
      .store
      .fail_run(run_id, ctx.stats, message.clone())
      .await
    {
      error!(%run_id, error = %e, "could not record failed run");
    }

    progress.set(SyncState::Failed);
    progress.emit(SyncEvent::Failed { message: message.clone() });
    RunReport {
      run_id,
      status: RunStatus::Failed,
      stats: ctx.stats,
      enrichment_failures: ctx.enrichment_failures,
      error: Some(message),
    }
  }
}

// ─── Plumbing ────────────────────────────────────────────────────────────────

/// The sending half of a run's progress reporting. Nobody listening is not
/// an error.
struct Progress {
  events: mpsc::UnboundedSender<SyncEvent>,
  state:  watch::Sender<SyncState>,
}

impl Progress {
  fn emit(&self, event: SyncEvent) { let _ = self.events.send(event); }

  fn set(&self, state: SyncState) { self.state.send_replace(state); }
}

/// Marks an owner as having a run in flight until dropped.
struct ActiveRun {
  owners: Arc<Mutex<HashSet<OwnerId>>>,
  owner:  OwnerId,
}

impl ActiveRun {
  fn claim(owners: &Arc<Mutex<HashSet<OwnerId>>>, owner: &OwnerId) -> Result<Self> {
    let mut set = owners.lock().unwrap_or_else(PoisonError::into_inner);
    if !set.insert(owner.clone()) {
      return Err(SyncError::AlreadyRunning(owner.clone()));
    }
    Ok(Self { owners: Arc::clone(owners), owner: owner.clone() })
  }
}

impl Drop for ActiveRun {
  fn drop(&mut self) {
    self
      .owners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.owner);
  }
}

/// Emit `ping` every `every` until the run reaches a terminal state or the
/// listener goes away.
async fn heartbeat(
  events: mpsc::UnboundedSender<SyncEvent>,
  mut state: watch::Receiver<SyncState>,
  every: Duration,
) {
  let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
  // The first tick completes immediately.
  ticker.tick().await;

  loop {
    tokio::select! {
      _ = ticker.tick() => {
        if state.borrow().is_terminal() {
          break;
        }
        if events.send(SyncEvent::Ping { timestamp: Utc::now() }).is_err() {
          break;
        }
      }
      changed = state.changed() => {
        if changed.is_err() || state.borrow().is_terminal() {
          break;
        }
      }
    }
  }
}
