//! stash-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, wires the bookmark and enrichment sources into the sync
//! engine and serves the JSON API under `/api`.

mod config;

use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use stash_api::AppState;
use stash_sources::{FxEnrichmentSource, XBookmarkSource};
use stash_store_sqlite::SqliteStore;
use stash_sync::Syncer;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Stash bookmark archive server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let posts = XBookmarkSource::new(server_cfg.post_source_url.clone())
    .context("failed to build bookmark source client")?;
  let enrichment = FxEnrichmentSource::new(server_cfg.enrichment_url.clone())
    .context("failed to build enrichment client")?;

  let syncer = Syncer::new(
    Arc::new(store),
    Arc::new(posts),
    Arc::new(enrichment),
    server_cfg.sync.into(),
  );
  let state = Arc::new(AppState::new(syncer));

  let app = Router::new()
    .nest("/api", stash_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!(store = ?store_path, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
