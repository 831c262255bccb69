//! Server configuration, deserialised from `config.toml` and overlaid with
//! environment variables such as `STASH__PORT` or
//! `STASH__SYNC__COOLDOWN_SECS`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;
use stash_sync::{RetryPolicy, SyncConfig};

// ─── Server ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  /// SQLite database file; a leading `~` is expanded.
  pub store_path:      PathBuf,
  /// Base URL of the bookmarks API.
  pub post_source_url: String,
  /// Base URL of the per-post status API.
  pub enrichment_url:  String,
  pub sync:            SyncSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".into(),
      port:            8080,
      store_path:      PathBuf::from("~/.local/share/stash/stash.db"),
      post_source_url: "https://api.x.com".into(),
      enrichment_url:  "https://api.fxtwitter.com".into(),
      sync:            SyncSettings::default(),
    }
  }
}

impl ServerConfig {
  /// Build from an optional TOML file overlaid with the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("STASH")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Sync ────────────────────────────────────────────────────────────────────

/// The `[sync]` table. Durations are plain numbers so they read naturally in
/// TOML and environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
  pub cooldown_secs:             u64,
  pub item_delay_ms:             u64,
  pub page_size:                 u32,
  pub heartbeat_secs:            u64,
  pub enrichment_attempts:       u32,
  pub enrichment_retry_delay_ms: u64,
}

impl Default for SyncSettings {
  fn default() -> Self { SyncConfig::default().into() }
}

impl From<SyncConfig> for SyncSettings {
  fn from(c: SyncConfig) -> Self {
    let ms = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    Self {
      cooldown_secs:             c.cooldown.as_secs(),
      item_delay_ms:             ms(c.item_delay),
      page_size:                 c.page_size,
      heartbeat_secs:            c.heartbeat.as_secs(),
      enrichment_attempts:       c.retry.attempts,
      enrichment_retry_delay_ms: ms(c.retry.delay),
    }
  }
}

impl From<SyncSettings> for SyncConfig {
  fn from(s: SyncSettings) -> Self {
    Self {
      cooldown:   Duration::from_secs(s.cooldown_secs),
      item_delay: Duration::from_millis(s.item_delay_ms),
      page_size:  s.page_size,
      heartbeat:  Duration::from_secs(s.heartbeat_secs),
      retry:      RetryPolicy {
        attempts: s.enrichment_attempts,
        delay:    Duration::from_millis(s.enrichment_retry_delay_ms),
      },
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn sync_defaults_round_trip_through_settings() {
    let settings = SyncSettings::default();
    assert_eq!(settings.cooldown_secs, 3600);
    assert_eq!(settings.item_delay_ms, 500);
    assert_eq!(settings.page_size, 100);
    assert_eq!(settings.heartbeat_secs, 15);
    assert_eq!(settings.enrichment_attempts, 2);
    assert_eq!(settings.enrichment_retry_delay_ms, 1000);
    assert_eq!(SyncConfig::from(settings), SyncConfig::default());
  }

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/stash.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.post_source_url, "https://api.x.com");
    assert_eq!(cfg.sync, SyncSettings::default());
  }

  #[test]
  fn file_overrides_are_partial() {
    let path = std::env::temp_dir().join(format!("stash-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "port = 9000\n\n[sync]\ncooldown_secs = 60").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.sync.cooldown_secs, 60);
    assert_eq!(cfg.sync.page_size, 100);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/a.db")), PathBuf::from(home).join("a.db"));
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
