//! Structured article bodies.
//!
//! Long-form posts carry their body as a block list plus an entity map (the
//! layout used by rich-text editors: each block is a paragraph/heading/list
//! item, entities hold links, media and embeds referenced from ranges inside
//! blocks). The body is stored as JSON text on the owning link row and parsed
//! back leniently: empty or malformed content means "no content".

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;

/// A parsed article body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
  pub blocks:     Vec<ArticleBlock>,
  #[serde(default, deserialize_with = "entity_map")]
  pub entity_map: BTreeMap<String, ArticleEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBlock {
  #[serde(default)]
  pub key:                 String,
  #[serde(default)]
  pub text:                String,
  /// Block type, e.g. `unstyled`, `header-two`, `unordered-list-item`.
  #[serde(rename = "type", default = "unstyled")]
  pub kind:                String,
  #[serde(default)]
  pub depth:               u32,
  #[serde(default)]
  pub inline_style_ranges: Vec<StyleRange>,
  #[serde(default)]
  pub entity_ranges:       Vec<EntityRange>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:                Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRange {
  pub offset: u32,
  pub length: u32,
  pub style:  String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRange {
  pub offset: u32,
  pub length: u32,
  /// Key into [`ArticleContent::entity_map`]; upstream sends either a number
  /// or a string.
  #[serde(deserialize_with = "entity_key")]
  pub key:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleEntity {
  #[serde(rename = "type")]
  pub kind:       String,
  #[serde(default)]
  pub mutability: String,
  #[serde(default)]
  pub data:       serde_json::Value,
}

impl ArticleContent {
  /// Parse a stored or fetched body. Returns `None` for blank input, invalid
  /// JSON, or a body without blocks.
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    if raw.is_empty() {
      return None;
    }
    Self::from_value(serde_json::from_str(raw).ok()?)
  }

  /// Lenient conversion from an already-decoded JSON value.
  pub fn from_value(value: serde_json::Value) -> Option<Self> {
    let content: Self = serde_json::from_value(value).ok()?;
    if content.blocks.is_empty() {
      None
    } else {
      Some(content)
    }
  }

  /// Serialise for the `content_json` column.
  pub fn to_json_string(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Plain text of the body, one block per line.
  pub fn plain_text(&self) -> String {
    self
      .blocks
      .iter()
      .map(|b| b.text.as_str())
      .collect::<Vec<_>>()
      .join("\n")
  }
}

fn unstyled() -> String { "unstyled".to_owned() }

/// Accepts `{"0": {...}}` as well as `[{"key": "0", "value": {...}}]`.
fn entity_map<'de, D>(
  de: D,
) -> std::result::Result<BTreeMap<String, ArticleEntity>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  struct Entry {
    #[serde(deserialize_with = "entity_key")]
    key:   String,
    value: ArticleEntity,
  }

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Shape {
    Map(BTreeMap<String, ArticleEntity>),
    List(Vec<Entry>),
  }

  Ok(match Shape::deserialize(de)? {
    Shape::Map(map) => map,
    Shape::List(entries) => {
      entries.into_iter().map(|e| (e.key, e.value)).collect()
    }
  })
}

fn entity_key<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Key {
    Num(u64),
    Str(String),
  }

  Ok(match Key::deserialize(de)? {
    Key::Num(n) => n.to_string(),
    Key::Str(s) => s,
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn sample() -> serde_json::Value {
    json!({
      "blocks": [
        {
          "key": "a1",
          "text": "Heading",
          "type": "header-two",
          "depth": 0,
          "inlineStyleRanges": [],
          "entityRanges": []
        },
        {
          "key": "b2",
          "text": "See the docs for more.",
          "type": "unstyled",
          "inlineStyleRanges": [{ "offset": 0, "length": 3, "style": "BOLD" }],
          "entityRanges": [{ "offset": 8, "length": 4, "key": 0 }]
        }
      ],
      "entityMap": [
        {
          "key": "0",
          "value": {
            "type": "LINK",
            "mutability": "MUTABLE",
            "data": { "url": "https://example.com/docs" }
          }
        }
      ]
    })
  }

  #[test]
  fn parses_list_shaped_entity_map() {
    let content = ArticleContent::from_value(sample()).unwrap();
    assert_eq!(content.blocks.len(), 2);
    assert_eq!(content.blocks[0].kind, "header-two");
    assert_eq!(content.blocks[1].entity_ranges[0].key, "0");
    assert_eq!(content.entity_map["0"].kind, "LINK");
  }

  #[test]
  fn serialise_then_parse_is_equivalent() {
    let content = ArticleContent::from_value(sample()).unwrap();
    let stored = content.to_json_string().unwrap();
    let back = ArticleContent::parse(&stored).unwrap();
    assert_eq!(back, content);
  }

  #[test]
  fn empty_and_malformed_content_is_none() {
    assert!(ArticleContent::parse("").is_none());
    assert!(ArticleContent::parse("   ").is_none());
    assert!(ArticleContent::parse("{not json").is_none());
    assert!(ArticleContent::parse("{\"blocks\": []}").is_none());
    assert!(ArticleContent::parse("[1, 2, 3]").is_none());
    assert!(ArticleContent::parse("{\"entityMap\": {}}").is_none());
  }

  #[test]
  fn plain_text_joins_blocks() {
    let content = ArticleContent::from_value(sample()).unwrap();
    assert_eq!(content.plain_text(), "Heading\nSee the docs for more.");
  }
}
