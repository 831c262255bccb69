//! Quote and retweet resolution, one hop deep.
//!
//! A quoted post becomes its own row (once per owner) and the referencing
//! post keeps a typed snapshot of it. A retweeted post only ever lives in the
//! retweet's snapshot. The quoted post's own references are never followed.

use stash_core::{
  post::{Category, NewPost, Post, status_url},
  snapshot::{EmbeddedPost, Snapshot},
  source::{Enrichment, EnrichmentSource, PostRef, RawLink},
  store::BookmarkStore,
};
use tracing::{debug, warn};

use crate::{
  Result, SyncError, context::RunContext, enrich::enrich_with_retry,
  pipeline::Pipeline,
};

/// How a quote reference was settled.
#[derive(Debug, Default)]
pub(crate) struct QuoteResolution {
  /// Set only when the quoted row exists for the owner.
  pub quoted_post_id: Option<String>,
  pub snapshot:       Option<Snapshot>,
}

impl<S, E> Pipeline<'_, S, E>
where
  S: BookmarkStore,
  E: EnrichmentSource,
{
  pub(crate) async fn resolve_quote(
    &self,
    ctx: &mut RunContext,
    reference: &PostRef,
  ) -> Result<QuoteResolution> {
    let post_id = reference.post_id.as_str();

    // Each quoted post is fetched at most once per run, failures included.
    if let Some(cached) = ctx.resolved_quote(post_id) {
      return match cached.cloned() {
        Some(embedded) => Ok(QuoteResolution {
          quoted_post_id: Some(post_id.to_owned()),
          snapshot:       Some(Snapshot::Quote(embedded)),
        }),
        None => self.stored_quote(ctx, post_id).await,
      };
    }

    let fetched = enrich_with_retry(
      self.enrichment,
      reference.author.as_deref().unwrap_or("i"),
      post_id,
      self.retry,
    )
    .await;

    match fetched {
      Ok(quoted) => {
        let embedded = quoted.embedded();
        if ctx
          .exists(self.store, post_id)
          .await
          .map_err(SyncError::store)?
        {
          debug!(owner = %ctx.owner, post_id, "quoted post already stored");
        } else {
          self.persist_quoted(ctx, quoted).await?;
        }
        ctx.remember_quote(post_id, Some(embedded.clone()));
        Ok(QuoteResolution {
          quoted_post_id: Some(post_id.to_owned()),
          snapshot:       Some(Snapshot::Quote(embedded)),
        })
      }
      Err(e) => {
        ctx.enrichment_failures += 1;
        warn!(owner = %ctx.owner, post_id, error = %e, "quoted post fetch failed");
        ctx.remember_quote(post_id, None);
        self.stored_quote(ctx, post_id).await
      }
    }
  }

  /// Fallback for a quoted post whose content could not be fetched: link
  /// and snapshot the owner's stored row when there is one.
  async fn stored_quote(
    &self,
    ctx: &RunContext,
    post_id: &str,
  ) -> Result<QuoteResolution> {
    if !ctx
      .exists(self.store, post_id)
      .await
      .map_err(SyncError::store)?
    {
      return Ok(QuoteResolution::default());
    }
    let stored = self
      .store
      .get_post(ctx.owner.clone(), post_id.to_owned())
      .await
      .map_err(SyncError::store)?;
    Ok(QuoteResolution {
      quoted_post_id: Some(post_id.to_owned()),
      snapshot:       stored.as_ref().map(|p| Snapshot::Quote(embedded_from_row(p))),
    })
  }

  /// Snapshot of a retweeted post. Failure leaves the retweet without one.
  pub(crate) async fn resolve_retweet(
    &self,
    ctx: &mut RunContext,
    reference: &PostRef,
  ) -> Option<Snapshot> {
    let author = reference.author.as_deref().unwrap_or("i");
    match enrich_with_retry(self.enrichment, author, &reference.post_id, self.retry)
      .await
    {
      Ok(retweeted) => Some(Snapshot::Retweet(retweeted.embedded())),
      Err(e) => {
        ctx.enrichment_failures += 1;
        warn!(
          owner = %ctx.owner,
          post_id = %reference.post_id,
          error = %e,
          "retweeted post fetch failed"
        );
        None
      }
    }
  }

  /// Store a quoted post as an independent row, categorised like any primary
  /// post. Its own quote reference is flagged but not followed.
  async fn persist_quoted(&self, ctx: &mut RunContext, quoted: Enrichment) -> Result<()> {
    let Enrichment { post, media, article, external } = quoted;
    let links: Vec<RawLink> = external.into_iter().collect();

    let category = if article.is_some() {
      Category::Article
    } else {
      Category::classify(media.iter().map(|m| m.kind), links.iter().map(|l| l.target_url()))
    };

    let row = NewPost {
      owner: ctx.owner.clone(),
      post_id: post.post_id.clone(),
      source_url: post
        .url
        .clone()
        .unwrap_or_else(|| status_url(&post.author, &post.post_id)),
      author: post.author.clone(),
      author_name: post.author_name,
      author_avatar: post.author_avatar,
      text: post.text,
      created_at: post.created_at,
      category,
      is_reply: post.is_reply,
      is_quote: post.quoted.is_some(),
      is_retweet: false,
      quoted_post_id: None,
      snapshot: article
        .as_ref()
        .map_or(Snapshot::None, |a| Snapshot::Article(a.summary())),
      raw: None,
    };

    let outcome = self
      .store
      .insert_post(row)
      .await
      .map_err(SyncError::store)?;
    if outcome.is_inserted() {
      ctx.mark_quoted_insert(&post.post_id);
      self
        .persist_children(&ctx.owner, &post.post_id, &media, &links, article.as_ref())
        .await?;
      debug!(owner = %ctx.owner, post_id = %post.post_id, "stored quoted post");
    }
    Ok(())
  }
}

/// Snapshot of an already-stored post, for when its content cannot be
/// fetched again.
fn embedded_from_row(post: &Post) -> EmbeddedPost {
  EmbeddedPost {
    post_id:       post.post_id.clone(),
    author:        post.author.clone(),
    author_name:   post.author_name.clone(),
    author_avatar: post.author_avatar.clone(),
    text:          post.text.clone(),
    url:           Some(post.source_url.clone()),
    created_at:    post.created_at,
    media:         Vec::new(),
    article:       match &post.snapshot {
      Snapshot::Article(a) => Some(a.clone()),
      _ => None,
    },
    external:      None,
  }
}
