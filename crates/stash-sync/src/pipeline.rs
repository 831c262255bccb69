//! Per-item ingest: dedup, enrichment, reference resolution, persistence.

use stash_core::{
  OwnerId,
  link::{LinkType, NewLink, classify_url, domain_of},
  media::Media,
  post::{Category, NewPost, status_url},
  snapshot::Snapshot,
  source::{EnrichedArticle, Enrichment, EnrichmentSource, RawLink, RawMedia, RawPost},
  store::BookmarkStore,
};
use tracing::{debug, warn};

use crate::{
  Result, SyncError, config::RetryPolicy, context::RunContext,
  enrich::enrich_with_retry, event::ProcessedItem,
};

/// Borrowed collaborators for one run.
pub(crate) struct Pipeline<'a, S, E> {
  pub store:      &'a S,
  pub enrichment: &'a E,
  pub retry:      RetryPolicy,
}

/// What [`Pipeline::ingest`] did with one primary item.
#[derive(Debug)]
pub(crate) enum Ingested {
  New(ProcessedItem),
  Duplicate(ProcessedItem),
}

impl<S, E> Pipeline<'_, S, E>
where
  S: BookmarkStore,
  E: EnrichmentSource,
{
  /// Process one primary post. `prefetched` skips the enrichment call when
  /// the caller already holds the post's enrichment.
  pub async fn ingest(
    &self,
    ctx: &mut RunContext,
    raw: RawPost,
    prefetched: Option<Enrichment>,
  ) -> Result<Ingested> {
    ctx.stats.total += 1;

    let fallback = Category::classify(
      raw.media.iter().map(|m| m.kind),
      raw.links.iter().map(RawLink::target_url),
    );

    if ctx.take_quoted_insert(&raw.post_id) {
      // Stored earlier in this run as another item's quote: new to the
      // owner, reported once as this bookmark.
      let category = self
        .store
        .get_post(ctx.owner.clone(), raw.post_id.clone())
        .await
        .map_err(SyncError::store)?
        .map_or(fallback, |p| p.category);
      ctx.stats.new += 1;
      debug!(owner = %ctx.owner, post_id = %raw.post_id, "bookmark stored earlier as a quote");
      return Ok(Ingested::New(ProcessedItem {
        post_id:  raw.post_id,
        author:   raw.author,
        category,
        is_new:   true,
      }));
    }

    if ctx
      .exists(self.store, &raw.post_id)
      .await
      .map_err(SyncError::store)?
    {
      ctx.stats.duplicates += 1;
      debug!(owner = %ctx.owner, post_id = %raw.post_id, "already stored");
      return Ok(Ingested::Duplicate(ProcessedItem {
        post_id:  raw.post_id,
        author:   raw.author,
        category: fallback,
        is_new:   false,
      }));
    }

    let enrichment = match prefetched {
      Some(e) => Some(e),
      None => match enrich_with_retry(
        self.enrichment,
        &raw.author,
        &raw.post_id,
        self.retry,
      )
      .await
      {
        Ok(e) => Some(e),
        Err(e) => {
          ctx.enrichment_failures += 1;
          warn!(
            owner = %ctx.owner,
            post_id = %raw.post_id,
            error = %e,
            "enrichment failed, keeping primary data"
          );
          None
        }
      },
    };

    let mut post = NewPost {
      owner:          ctx.owner.clone(),
      post_id:        raw.post_id.clone(),
      source_url:     raw
        .url
        .clone()
        .unwrap_or_else(|| status_url(&raw.author, &raw.post_id)),
      author:         raw.author.clone(),
      author_name:    raw.author_name.clone(),
      author_avatar:  raw.author_avatar.clone(),
      text:           raw.text.clone(),
      created_at:     raw.created_at,
      category:       fallback,
      is_reply:       raw.is_reply,
      is_quote:       false,
      is_retweet:     false,
      quoted_post_id: None,
      snapshot:       Snapshot::None,
      raw:            (!raw.raw.is_null()).then(|| raw.raw.clone()),
    };

    let mut media = raw.media.clone();
    let mut links = raw.links.clone();
    let mut article = None;
    let mut quoted = raw.quoted.clone();

    if let Some(enrichment) = enrichment {
      if let Some(category) = enrichment.category() {
        post.category = category;
      }
      if let Some(a) = &enrichment.article {
        post.snapshot = Snapshot::Article(a.summary());
      }
      let Enrichment { post: enriched, media: extra_media, article: extra_article, external } =
        enrichment;
      post.author_name = post.author_name.or(enriched.author_name);
      post.author_avatar = post.author_avatar.or(enriched.author_avatar);
      if media.is_empty() {
        media = extra_media;
      }
      if links.is_empty() {
        links.extend(external);
      }
      article = extra_article;
      quoted = quoted.or(enriched.quoted);
    }

    if let Some(reference) = &quoted {
      let resolution = self.resolve_quote(ctx, reference).await?;
      post.is_quote = true;
      post.quoted_post_id = resolution.quoted_post_id;
      if let Some(snapshot) = resolution.snapshot {
        post.snapshot = snapshot;
      }
    } else if let Some(reference) = &raw.retweeted {
      post.is_retweet = true;
      if let Some(snapshot) = self.resolve_retweet(ctx, reference).await {
        post.snapshot = snapshot;
      }
    }

    let item = ProcessedItem {
      post_id:  post.post_id.clone(),
      author:   post.author.clone(),
      category: post.category,
      is_new:   true,
    };

    let outcome = self
      .store
      .insert_post(post)
      .await
      .map_err(SyncError::store)?;
    if !outcome.is_inserted() {
      // Lost a race against a concurrent writer of the same key.
      ctx.stats.duplicates += 1;
      return Ok(Ingested::Duplicate(ProcessedItem { is_new: false, ..item }));
    }

    ctx.stats.new += 1;
    ctx.mark_inserted(&item.post_id);
    self
      .persist_children(&ctx.owner, &item.post_id, &media, &links, article.as_ref())
      .await?;

    Ok(Ingested::New(item))
  }

  /// Write the media and link rows hanging off a freshly inserted post.
  pub async fn persist_children(
    &self,
    owner: &OwnerId,
    post_id: &str,
    media: &[RawMedia],
    links: &[RawLink],
    article: Option<&EnrichedArticle>,
  ) -> Result<()> {
    for m in media {
      self
        .store
        .insert_media(media_row(owner, post_id, m))
        .await
        .map_err(SyncError::store)?;
    }
    for l in links {
      self
        .store
        .insert_link(link_row(owner, post_id, l))
        .await
        .map_err(SyncError::store)?;
    }
    if let Some(a) = article {
      self
        .store
        .insert_link(article_row(owner, post_id, a))
        .await
        .map_err(SyncError::store)?;
    }
    Ok(())
  }
}

// ─── Row builders ────────────────────────────────────────────────────────────

fn media_row(owner: &OwnerId, post_id: &str, m: &RawMedia) -> Media {
  Media {
    owner:       owner.clone(),
    media_id:    m.media_id.clone(),
    post_id:     post_id.to_owned(),
    kind:        m.kind,
    url:         m.url.clone(),
    preview_url: m.preview_url.clone(),
    width:       m.width,
    height:      m.height,
    duration_ms: m.duration_ms,
  }
}

fn link_row(owner: &OwnerId, post_id: &str, l: &RawLink) -> NewLink {
  let target = l.target_url();
  NewLink {
    owner:               owner.clone(),
    post_id:             post_id.to_owned(),
    url:                 l.url.clone(),
    expanded_url:        l.expanded_url.clone(),
    domain:              domain_of(target),
    link_type:           classify_url(target),
    preview_title:       l.title.clone(),
    preview_description: l.description.clone(),
    preview_image_url:   l.image_url.clone(),
    content:             None,
  }
}

fn article_row(owner: &OwnerId, post_id: &str, a: &EnrichedArticle) -> NewLink {
  let url = a
    .url
    .clone()
    .unwrap_or_else(|| format!("https://x.com/i/article/{post_id}"));
  NewLink {
    owner:               owner.clone(),
    post_id:             post_id.to_owned(),
    domain:              domain_of(&url),
    url,
    expanded_url:        None,
    link_type:           LinkType::Article,
    preview_title:       Some(a.title.clone()),
    preview_description: a.preview_text.clone(),
    preview_image_url:   a.cover_image_url.clone(),
    content:             a.content.clone(),
  }
}
