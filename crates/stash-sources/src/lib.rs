//! HTTP implementations of the two collaborators the sync engine talks to.
//!
//! * [`XBookmarkSource`] pages through an owner's bookmarks on the X API v2.
//! * [`FxEnrichmentSource`] fetches one post's full content from an
//!   fxtwitter-style status API.
//!
//! Both map transport and status failures onto [`SourceError`].

mod http;

pub mod fx;
pub mod x;

pub use fx::FxEnrichmentSource;
pub use stash_core::source::SourceError;
pub use x::XBookmarkSource;
