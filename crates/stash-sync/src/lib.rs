//! The Stash sync engine.
//!
//! [`Syncer`] drives one run per owner: it pages through the owner's
//! bookmarks, enriches every new post, resolves quote and retweet references
//! one hop deep and persists everything insert-or-skip. Progress is reported
//! as a stream of [`SyncEvent`]s plus a [`SyncState`] watch channel.

pub mod config;
pub mod context;
pub mod cooldown;
pub mod enrich;
pub mod error;
pub mod event;
mod pipeline;
mod resolve;
pub mod syncer;

pub use config::{RetryPolicy, SyncConfig};
pub use context::RunContext;
pub use cooldown::CooldownStatus;
pub use error::{Result, SyncError};
pub use event::{ProcessedItem, SyncEvent, SyncState};
pub use syncer::{AddOutcome, RunReport, SyncHandle, SyncOptions, Syncer};
