//! The Stash read path.
//!
//! [`FeedAssembler`] turns one owner-scoped page of posts into
//! [`FeedItem`]s: every item joined with its media, links, tags and read
//! status, its display category and preview link chosen, and a two-level
//! quote graph attached (the post it quotes and the page-visible posts that
//! quote it). Every query it issues is bounded by the page, never by the
//! owner's whole archive.

mod assemble;
pub mod error;
pub mod item;

pub use assemble::{DEFAULT_LIMIT, FeedAssembler, MAX_LIMIT};
pub use error::{FeedError, Result};
pub use item::{FeedItem, FeedPage, QuoteRef, QuotedPost, QuotedView};
