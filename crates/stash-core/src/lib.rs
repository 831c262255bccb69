//! Core types and trait definitions for the Stash bookmark archive.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, collaborator clients, the sync engine and the feed
//! assembler all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod article;
pub mod error;
pub mod link;
pub mod media;
pub mod owner;
pub mod post;
pub mod run;
pub mod snapshot;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use owner::OwnerId;
