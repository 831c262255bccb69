//! Links attached to a post, article detection, and preview selection.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{OwnerId, article::ArticleContent, post::Category};

/// How a link was classified when it was stored.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkType {
  /// A link to another post on the platform.
  Tweet,
  /// A long-form article (native or a known publishing platform).
  Article,
  /// Any other external page.
  External,
}

/// Input to [`crate::store::BookmarkStore::insert_link`]. The row id is
/// assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
  pub owner:               OwnerId,
  pub post_id:             String,
  pub url:                 String,
  pub expanded_url:        Option<String>,
  pub domain:              Option<String>,
  pub link_type:           LinkType,
  pub preview_title:       Option<String>,
  pub preview_description: Option<String>,
  pub preview_image_url:   Option<String>,
  pub content:             Option<ArticleContent>,
}

/// A persisted link row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
  pub link_id:             i64,
  pub owner:               OwnerId,
  pub post_id:             String,
  pub url:                 String,
  pub expanded_url:        Option<String>,
  pub domain:              Option<String>,
  pub link_type:           LinkType,
  pub preview_title:       Option<String>,
  pub preview_description: Option<String>,
  pub preview_image_url:   Option<String>,
  pub content:             Option<ArticleContent>,
}

impl Link {
  /// The URL a reader ends up on.
  pub fn target_url(&self) -> &str {
    self.expanded_url.as_deref().unwrap_or(&self.url)
  }

  /// Display classification: the stored type, upgraded to
  /// [`LinkType::Article`] when the target matches a known article path.
  pub fn effective_type(&self) -> LinkType {
    if is_article_url(self.target_url()) {
      LinkType::Article
    } else {
      self.link_type
    }
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

static ARTICLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  [
    // Native long-form posts.
    r"^https?://(www\.)?(x|twitter)\.com/i/articles?/\d+",
    r"^https?://(www\.)?(x|twitter)\.com/[A-Za-z0-9_]+/articles?/\d+",
    // Publishing platforms.
    r"^https?://[a-z0-9-]+\.substack\.com/p/[^/?#]+",
    r"^https?://(www\.)?medium\.com/(@[^/]+/)?[^/?#]+-[0-9a-f]{8,}",
    r"^https?://[a-z0-9-]+\.medium\.com/[^/?#]+-[0-9a-f]{8,}",
  ]
  .into_iter()
  .filter_map(|p| Regex::new(p).ok())
  .collect()
});

/// Whether `url` points at a long-form article.
pub fn is_article_url(url: &str) -> bool {
  ARTICLE_PATTERNS.iter().any(|re| re.is_match(url))
}

/// Whether `url` points at another post on the platform.
pub fn is_post_url(url: &str) -> bool {
  static POST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.|mobile\.)?(x|twitter)\.com/[A-Za-z0-9_]+/status/\d+").ok()
  });
  POST.as_ref().is_some_and(|re| re.is_match(url))
}

/// Classify a link target at ingest time.
pub fn classify_url(url: &str) -> LinkType {
  if is_article_url(url) {
    LinkType::Article
  } else if is_post_url(url) {
    LinkType::Tweet
  } else {
    LinkType::External
  }
}

/// Host part of `url` without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
  let rest = url.split_once("://").map(|(_, r)| r)?;
  let host = rest
    .split(['/', '?', '#'])
    .next()
    .filter(|h| !h.is_empty())?;
  let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
  let host = host.split(':').next().unwrap_or(host);
  Some(host.trim_start_matches("www.").to_ascii_lowercase())
}

/// The category a post is displayed under. Any link whose target matches an
/// article path reclassifies the post as [`Category::Article`] regardless of
/// the stored category.
pub fn effective_category(stored: Category, links: &[Link]) -> Category {
  if links.iter().any(|l| l.effective_type() == LinkType::Article) {
    Category::Article
  } else {
    stored
  }
}

// ─── Preview selection ───────────────────────────────────────────────────────

/// Choose the link that backs a post's preview card.
///
/// Precedence: the first link explicitly typed `article`; otherwise the first
/// link with a preview title; otherwise the first link with a preview image;
/// otherwise nothing.
pub fn select_preview(links: &[Link]) -> Option<&Link> {
  links
    .iter()
    .find(|l| l.link_type == LinkType::Article)
    .or_else(|| links.iter().find(|l| l.preview_title.is_some()))
    .or_else(|| links.iter().find(|l| l.preview_image_url.is_some()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn link(link_type: LinkType, title: Option<&str>, image: Option<&str>) -> Link {
    Link {
      link_id: 0,
      owner: OwnerId::new("owner"),
      post_id: "1".into(),
      url: "https://t.co/abc".into(),
      expanded_url: None,
      domain: None,
      link_type,
      preview_title: title.map(str::to_owned),
      preview_description: None,
      preview_image_url: image.map(str::to_owned),
      content: None,
    }
  }

  #[test]
  fn article_typed_link_wins_regardless_of_position() {
    let links = vec![
      link(LinkType::Tweet, None, None),
      link(LinkType::Article, Some("My Article"), None),
    ];
    let chosen = select_preview(&links).unwrap();
    assert_eq!(chosen.link_type, LinkType::Article);
    assert_eq!(chosen.preview_title.as_deref(), Some("My Article"));
  }

  #[test]
  fn article_typed_link_beats_earlier_titled_link() {
    let links = vec![
      link(LinkType::External, Some("Earlier"), None),
      link(LinkType::Article, None, None),
    ];
    assert_eq!(select_preview(&links).unwrap().link_type, LinkType::Article);
  }

  #[test]
  fn falls_back_to_first_titled_link() {
    let links = vec![
      link(LinkType::Tweet, None, None),
      link(LinkType::External, Some("External Article"), None),
    ];
    let chosen = select_preview(&links).unwrap();
    assert_eq!(chosen.link_type, LinkType::External);
    assert_eq!(chosen.preview_title.as_deref(), Some("External Article"));
  }

  #[test]
  fn falls_back_to_first_link_with_image() {
    let links = vec![
      link(LinkType::Tweet, None, None),
      link(LinkType::External, None, Some("https://img.example/a.png")),
      link(LinkType::External, None, Some("https://img.example/b.png")),
    ];
    let chosen = select_preview(&links).unwrap();
    assert_eq!(
      chosen.preview_image_url.as_deref(),
      Some("https://img.example/a.png")
    );
  }

  #[test]
  fn no_preview_data_selects_nothing() {
    let links = vec![
      link(LinkType::Tweet, None, None),
      link(LinkType::External, None, None),
    ];
    assert!(select_preview(&links).is_none());
    assert!(select_preview(&[]).is_none());
  }

  #[test]
  fn article_paths_are_recognised() {
    assert!(is_article_url("https://x.com/i/article/1790000000000000000"));
    assert!(is_article_url("https://twitter.com/someone/article/123"));
    assert!(is_article_url("https://writer.substack.com/p/on-caching"));
    assert!(is_article_url(
      "https://medium.com/@dev/why-rust-works-3f2a9c1b7d4e"
    ));
    assert!(!is_article_url("https://x.com/someone/status/123"));
    assert!(!is_article_url("https://example.com/blog"));
  }

  #[test]
  fn classify_url_distinguishes_posts_articles_and_pages() {
    assert_eq!(classify_url("https://x.com/a/status/1"), LinkType::Tweet);
    assert_eq!(classify_url("https://x.com/i/article/9"), LinkType::Article);
    assert_eq!(classify_url("https://example.com/x"), LinkType::External);
  }

  #[test]
  fn effective_category_is_upgraded_by_article_links() {
    let mut l = link(LinkType::External, None, None);
    l.expanded_url = Some("https://x.com/i/article/42".into());
    assert_eq!(effective_category(Category::Tweet, &[l]), Category::Article);
    assert_eq!(
      effective_category(Category::Photo, &[link(LinkType::External, None, None)]),
      Category::Photo
    );
  }

  #[test]
  fn domain_strips_www_and_port() {
    assert_eq!(domain_of("https://www.Example.com:8443/a?b").as_deref(), Some("example.com"));
    assert_eq!(domain_of("https://t.co/abc").as_deref(), Some("t.co"));
    assert_eq!(domain_of("not a url"), None);
  }
}
