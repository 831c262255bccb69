//! Bounded retry around the enrichment source.

use stash_core::source::{Enrichment, EnrichmentSource, SourceError};
use tracing::debug;

use crate::config::RetryPolicy;

/// Fetch enrichment for one post, retrying with a fixed delay. `NotFound` is
/// returned immediately; no retry can change it.
pub async fn enrich_with_retry<E: EnrichmentSource>(
  source: &E,
  author: &str,
  post_id: &str,
  policy: RetryPolicy,
) -> Result<Enrichment, SourceError> {
  let attempts = policy.attempts.max(1);
  let mut attempt = 1;
  loop {
    match source.fetch(author.to_owned(), post_id.to_owned()).await {
      Ok(enrichment) => return Ok(enrichment),
      Err(e) if attempt < attempts && e != SourceError::NotFound => {
        debug!(post_id, attempt, error = %e, "enrichment failed, retrying");
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}
