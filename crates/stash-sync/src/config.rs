//! Tunables for the sync engine.

use std::time::Duration;

/// How often and how patiently to retry a failed enrichment fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Zero behaves like one.
  pub attempts: u32,
  /// Fixed pause between attempts.
  pub delay:    Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { attempts: 2, delay: Duration::from_secs(1) }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
  /// Minimum time between the end of a completed run and the next start.
  pub cooldown:   Duration,
  /// Pause between consecutive items, to stay under the source's rate limit.
  pub item_delay: Duration,
  /// `max_results` requested per page.
  pub page_size:  u32,
  /// Interval of the `ping` heartbeat on the event stream.
  pub heartbeat:  Duration,
  pub retry:      RetryPolicy,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      cooldown:   Duration::from_secs(60 * 60),
      item_delay: Duration::from_millis(500),
      page_size:  100,
      heartbeat:  Duration::from_secs(15),
      retry:      RetryPolicy::default(),
    }
  }
}
