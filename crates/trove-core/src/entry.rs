//! CatalogEntry — the unit of persisted, displayable, monetized content.
//!
//! An entry is created by the ingestion pipeline and mutated only by
//! re-ingestion of the same identity (upsert) or by the redirect validator
//! marking it expired/invalid. Entries are never hard-deleted here; deletion
//! is an admin concern outside this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::Result;

// ─── Source identity ─────────────────────────────────────────────────────────

/// Which kind of inbound channel produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
  Telegram,
  Rss,
  Api,
  Manual,
}

impl SourceType {
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "telegram" => Ok(Self::Telegram),
      "rss" => Ok(Self::Rss),
      "api" => Ok(Self::Api),
      "manual" => Ok(Self::Manual),
      other => Err(crate::Error::UnknownSourceType(other.to_string())),
    }
  }

  /// Sources fed by automation get keyword categorization; manual entries
  /// keep whatever the operator chose.
  pub fn is_automated(self) -> bool { !matches!(self, Self::Manual) }
}

// ─── Content type ────────────────────────────────────────────────────────────

/// Tagged discriminant for what an entry actually sells.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
  #[default]
  Product,
  Service,
  App,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of an entry. Exactly one `Active` entry exists per
/// identity key at any time; the upsert enforces this.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
  #[default]
  Active,
  Expired,
  Invalid,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A structural problem that makes an entry unstorable. Ingestion that cannot
/// populate these fields after all fallbacks is rejected, never persisted
/// with blanks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("title is empty")]
  MissingTitle,

  #[error("image_url is empty")]
  MissingImage,

  #[error("no display pages assigned")]
  MissingDisplayPages,

  #[error("entry has neither a source id nor a canonical url")]
  MissingIdentity,
}

// ─── NewEntry ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CatalogStore::upsert`]. The id, timestamps and
/// status are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
  pub source_type:          SourceType,
  pub source_id:            Option<String>,
  /// The resolved product-page URL, kept unmodified for re-extraction.
  pub canonical_url:        Option<String>,
  /// The monetized URL visitors are redirected to. Equal to `canonical_url`
  /// when no network matched (`monetized = false`).
  pub affiliate_url:        String,
  /// Affiliate network id, e.g. `"cuelinks"`. `None` when unmonetized.
  pub network:              Option<String>,
  pub monetized:            bool,
  pub title:                String,
  pub description:          Option<String>,
  pub image_url:            String,
  pub price:                Option<f64>,
  pub original_price:       Option<f64>,
  pub currency:             Option<String>,
  pub rating:               Option<f64>,
  pub review_count:         Option<u32>,
  pub discount_percent:     Option<u8>,
  pub category:             String,
  pub content_type:         ContentType,
  pub is_featured:          bool,
  pub display_pages:        Vec<String>,
  pub expires_at:           Option<DateTime<Utc>>,
  pub timer_started_at:     Option<DateTime<Utc>>,
  pub timer_duration_hours: Option<i64>,
}

impl NewEntry {
  /// Enforce the mandatory-field invariant. Called by every store backend
  /// before any write; a failing entry is rejected, not partially written.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::MissingTitle);
    }
    if self.image_url.trim().is_empty() {
      return Err(ValidationError::MissingImage);
    }
    if self.display_pages.iter().all(|p| p.trim().is_empty()) {
      return Err(ValidationError::MissingDisplayPages);
    }
    if self.source_id.as_deref().is_none_or(str::is_empty)
      && self.canonical_url.as_deref().is_none_or(str::is_empty)
    {
      return Err(ValidationError::MissingIdentity);
    }
    Ok(())
  }
}

// ─── CatalogEntry ────────────────────────────────────────────────────────────

/// The persisted form of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub id:                   Uuid,
  pub source_type:          SourceType,
  pub source_id:            Option<String>,
  pub canonical_url:        Option<String>,
  pub affiliate_url:        String,
  pub network:              Option<String>,
  pub monetized:            bool,
  pub title:                String,
  pub description:          Option<String>,
  pub image_url:            String,
  pub price:                Option<f64>,
  pub original_price:       Option<f64>,
  pub currency:             Option<String>,
  pub rating:               Option<f64>,
  pub review_count:         Option<u32>,
  pub discount_percent:     Option<u8>,
  pub category:             String,
  pub content_type:         ContentType,
  pub is_featured:          bool,
  pub display_pages:        Vec<String>,
  pub status:               EntryStatus,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub expires_at:           Option<DateTime<Utc>>,
  pub timer_started_at:     Option<DateTime<Utc>>,
  pub timer_duration_hours: Option<i64>,
}

impl CatalogEntry {
  /// The moment the countdown timer runs out, if one is set.
  pub fn timer_deadline(&self) -> Option<DateTime<Utc>> {
    let started = self.timer_started_at?;
    let hours = self.timer_duration_hours?;
    Some(started + chrono::Duration::hours(hours))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry() -> NewEntry {
    NewEntry {
      source_type:          SourceType::Telegram,
      source_id:            Some("12345".into()),
      canonical_url:        Some("https://shop.example/item/42".into()),
      affiliate_url:        "https://shop.example/item/42".into(),
      network:              None,
      monetized:            false,
      title:                "Example Item".into(),
      description:          None,
      image_url:            "https://shop.example/item/42.jpg".into(),
      price:                Some(999.0),
      original_price:       None,
      currency:             Some("INR".into()),
      rating:               None,
      review_count:         None,
      discount_percent:     None,
      category:             "General".into(),
      content_type:         ContentType::Product,
      is_featured:          false,
      display_pages:        vec!["home".into()],
      expires_at:           None,
      timer_started_at:     None,
      timer_duration_hours: None,
    }
  }

  #[test]
  fn valid_entry_passes() {
    assert!(entry().validate().is_ok());
  }

  #[test]
  fn blank_title_rejected() {
    let mut e = entry();
    e.title = "   ".into();
    assert_eq!(e.validate(), Err(ValidationError::MissingTitle));
  }

  #[test]
  fn blank_image_rejected() {
    let mut e = entry();
    e.image_url = String::new();
    assert_eq!(e.validate(), Err(ValidationError::MissingImage));
  }

  #[test]
  fn empty_display_pages_rejected() {
    let mut e = entry();
    e.display_pages = vec![];
    assert_eq!(e.validate(), Err(ValidationError::MissingDisplayPages));
  }

  #[test]
  fn identity_requires_source_id_or_url() {
    let mut e = entry();
    e.source_id = None;
    e.canonical_url = None;
    assert_eq!(e.validate(), Err(ValidationError::MissingIdentity));

    e.canonical_url = Some("https://shop.example/item/42".into());
    assert!(e.validate().is_ok());
  }

  #[test]
  fn timer_deadline_needs_both_fields() {
    let mut e = CatalogEntry {
      id:                   Uuid::new_v4(),
      status:               EntryStatus::Active,
      created_at:           Utc::now(),
      updated_at:           Utc::now(),
      source_type:          SourceType::Telegram,
      source_id:            None,
      canonical_url:        None,
      affiliate_url:        String::new(),
      network:              None,
      monetized:            false,
      title:                String::new(),
      description:          None,
      image_url:            String::new(),
      price:                None,
      original_price:       None,
      currency:             None,
      rating:               None,
      review_count:         None,
      discount_percent:     None,
      category:             String::new(),
      content_type:         ContentType::Product,
      is_featured:          false,
      display_pages:        vec![],
      expires_at:           None,
      timer_started_at:     Some(Utc::now()),
      timer_duration_hours: None,
    };
    assert!(e.timer_deadline().is_none());

    e.timer_duration_hours = Some(6);
    let deadline = e.timer_deadline().unwrap();
    assert!(deadline > e.timer_started_at.unwrap());
  }
}
