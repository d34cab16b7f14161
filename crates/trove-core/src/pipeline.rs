//! Intermediate values passed between ingestion pipeline stages.
//!
//! None of these are persisted. The pipeline turns a [`RawInput`] into a
//! [`crate::entry::NewEntry`] by way of resolution, extraction, link
//! building and classification; only the final entry reaches storage.

use serde::{Deserialize, Serialize};

use crate::entry::SourceType;

// ─── RawInput ────────────────────────────────────────────────────────────────

/// What a source adapter hands the pipeline: a message body, maybe a URL,
/// and where it came from. Accepts the camelCase key spellings the upstream
/// source adapters emit alongside the snake_case ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
  #[serde(default)]
  pub text:          String,
  pub url:           Option<String>,
  #[serde(alias = "sourceType")]
  pub source_type:   SourceType,
  #[serde(alias = "sourceId")]
  pub source_id:     Option<String>,
  /// Slug of the originating channel, e.g. `"prime-picks"`. Used as a
  /// categorization hint.
  pub channel:       Option<String>,
  /// Caller-requested display pages; merged with the classifier's
  /// assignments. A bare string is treated as a one-page list.
  #[serde(
    default,
    alias = "displayPages",
    deserialize_with = "page_or_pages"
  )]
  pub display_pages: Vec<String>,
}

fn page_or_pages<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Pages {
    One(String),
    Many(Vec<String>),
  }

  Ok(match Pages::deserialize(de)? {
    Pages::One(page) => vec![page],
    Pages::Many(pages) => pages,
  })
}

// ─── ResolvedLink ────────────────────────────────────────────────────────────

/// How a canonical URL was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
  /// The input URL was already canonical (or resolution failed and the
  /// input was kept as a best-effort answer).
  Direct,
  /// The chain of HTTP redirects from a shortener was followed.
  ShortenerExpand,
  /// The destination was embedded in a redirector's query parameter and
  /// extracted without a network call.
  RedirectorParam,
}

/// Output of the URL resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLink {
  pub canonical_url: String,
  pub hops_taken:    u32,
  pub method:        ResolutionMethod,
}

// ─── ProductSnapshot ─────────────────────────────────────────────────────────

/// Normalized product data scraped from a page (or recovered from message
/// text). All numeric fields are typed; malformed strings never survive
/// extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSnapshot {
  pub title:          Option<String>,
  pub description:    Option<String>,
  /// Always set by the time the snapshot leaves the extractor — a
  /// placeholder stands in when no usable image was found.
  pub image_url:      Option<String>,
  pub price:          Option<f64>,
  pub original_price: Option<f64>,
  pub currency:       Option<String>,
  pub rating:         Option<f64>,
  pub review_count:   Option<u32>,
  pub category_hint:  Option<String>,
}

impl ProductSnapshot {
  /// Percentage off, computed only when both prices are present and sane.
  pub fn discount_percent(&self) -> Option<u8> {
    let (orig, cur) = (self.original_price?, self.price?);
    if orig > cur && cur > 0.0 {
      Some(((orig - cur) / orig * 100.0).round() as u8)
    } else {
      None
    }
  }
}

// ─── AffiliateLink ───────────────────────────────────────────────────────────

/// Output of the affiliate link builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateLink {
  pub monetized_url:   String,
  /// Network id, e.g. `"cuelinks"`. `None` when no network matched and the
  /// canonical URL is carried through unmonetized.
  pub network:         Option<String>,
  /// The input was already wrapped for some network and was returned
  /// unchanged.
  pub already_wrapped: bool,
}

// ─── CategoryAssignment ──────────────────────────────────────────────────────

/// Output of a [`crate::classify::Classifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAssignment {
  pub category:      String,
  pub content_type:  crate::entry::ContentType,
  pub is_featured:   bool,
  /// 0..=100. Channel hints contribute a baseline; keyword evidence adds
  /// the rest.
  pub confidence:    u8,
  pub display_pages: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn raw_input_accepts_page_string_or_list() {
    let input: RawInput = serde_json::from_str(
      r#"{"source_type":"manual","display_pages":"top-picks"}"#,
    )
    .unwrap();
    assert_eq!(input.display_pages, vec!["top-picks".to_owned()]);

    let input: RawInput = serde_json::from_str(
      r#"{"source_type":"manual","display_pages":["home","apps"]}"#,
    )
    .unwrap();
    assert_eq!(
      input.display_pages,
      vec!["home".to_owned(), "apps".to_owned()]
    );
  }

  #[test]
  fn raw_input_accepts_camel_case_keys() {
    let input: RawInput = serde_json::from_str(
      r#"{"sourceType":"api","sourceId":"a1","displayPages":"home"}"#,
    )
    .unwrap();
    assert_eq!(input.source_type, crate::entry::SourceType::Api);
    assert_eq!(input.source_id.as_deref(), Some("a1"));
    assert_eq!(input.display_pages, vec!["home".to_owned()]);
  }

  #[test]
  fn discount_needs_original_above_current() {
    let mut snap = ProductSnapshot {
      price: Some(999.0),
      original_price: Some(1999.0),
      ..Default::default()
    };
    assert_eq!(snap.discount_percent(), Some(50));

    snap.original_price = Some(999.0);
    assert_eq!(snap.discount_percent(), None);

    snap.original_price = Some(500.0);
    assert_eq!(snap.discount_percent(), None);

    snap.price = Some(0.0);
    snap.original_price = Some(100.0);
    assert_eq!(snap.discount_percent(), None);
  }

  #[test]
  fn discount_rounds_to_nearest_percent() {
    let snap = ProductSnapshot {
      price: Some(666.0),
      original_price: Some(1000.0),
      ..Default::default()
    };
    // 33.4% rounds down.
    assert_eq!(snap.discount_percent(), Some(33));
  }
}
