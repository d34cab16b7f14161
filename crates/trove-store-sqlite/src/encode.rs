//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, enums as their lowercase discriminants, and `display_pages` as a
//! compact JSON array.

use chrono::{DateTime, Utc};
use trove_core::{
  click::ClickOutcome,
  entry::{CatalogEntry, ContentType, EntryStatus, SourceType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── SourceType ──────────────────────────────────────────────────────────────

pub fn encode_source_type(s: SourceType) -> &'static str {
  match s {
    SourceType::Telegram => "telegram",
    SourceType::Rss => "rss",
    SourceType::Api => "api",
    SourceType::Manual => "manual",
  }
}

pub fn decode_source_type(s: &str) -> Result<SourceType> {
  SourceType::parse(s).map_err(|_| Error::Decode(format!("source type {s:?}")))
}

// ─── ContentType ─────────────────────────────────────────────────────────────

pub fn encode_content_type(c: ContentType) -> &'static str {
  match c {
    ContentType::Product => "product",
    ContentType::Service => "service",
    ContentType::App => "app",
  }
}

pub fn decode_content_type(s: &str) -> Result<ContentType> {
  match s {
    "product" => Ok(ContentType::Product),
    "service" => Ok(ContentType::Service),
    "app" => Ok(ContentType::App),
    other => Err(Error::Decode(format!("content type {other:?}"))),
  }
}

// ─── EntryStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: EntryStatus) -> &'static str {
  match s {
    EntryStatus::Active => "active",
    EntryStatus::Expired => "expired",
    EntryStatus::Invalid => "invalid",
  }
}

pub fn decode_status(s: &str) -> Result<EntryStatus> {
  match s {
    "active" => Ok(EntryStatus::Active),
    "expired" => Ok(EntryStatus::Expired),
    "invalid" => Ok(EntryStatus::Invalid),
    other => Err(Error::Decode(format!("entry status {other:?}"))),
  }
}

// ─── ClickOutcome ────────────────────────────────────────────────────────────

pub fn decode_outcome(s: &str) -> Result<ClickOutcome> {
  match s {
    "redirected" => Ok(ClickOutcome::Redirected),
    "expired" => Ok(ClickOutcome::Expired),
    "invalid" => Ok(ClickOutcome::Invalid),
    "error" => Ok(ClickOutcome::Error),
    other => Err(Error::Decode(format!("click outcome {other:?}"))),
  }
}

// ─── Display pages ───────────────────────────────────────────────────────────

pub fn encode_pages(pages: &[String]) -> Result<String> {
  Ok(serde_json::to_string(pages)?)
}

pub fn decode_pages(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `entries` row.
pub struct RawEntry {
  pub id:                   String,
  pub source_type:          String,
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
  pub content_type:         String,
  pub is_featured:          bool,
  pub display_pages:        String,
  pub status:               String,
  pub created_at:           String,
  pub updated_at:           String,
  pub expires_at:           Option<String>,
  pub timer_started_at:     Option<String>,
  pub timer_duration_hours: Option<i64>,
}

impl RawEntry {
  /// Column list matching [`RawEntry::from_row`]'s ordering.
  pub const COLUMNS: &'static str = "id, source_type, source_id, \
     canonical_url, affiliate_url, network, monetized, title, description, \
     image_url, price, original_price, currency, rating, review_count, \
     discount_percent, category, content_type, is_featured, display_pages, \
     status, created_at, updated_at, expires_at, timer_started_at, \
     timer_duration_hours";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      source_type:          row.get(1)?,
      source_id:            row.get(2)?,
      canonical_url:        row.get(3)?,
      affiliate_url:        row.get(4)?,
      network:              row.get(5)?,
      monetized:            row.get(6)?,
      title:                row.get(7)?,
      description:          row.get(8)?,
      image_url:            row.get(9)?,
      price:                row.get(10)?,
      original_price:       row.get(11)?,
      currency:             row.get(12)?,
      rating:               row.get(13)?,
      review_count:         row.get(14)?,
      discount_percent:     row.get(15)?,
      category:             row.get(16)?,
      content_type:         row.get(17)?,
      is_featured:          row.get(18)?,
      display_pages:        row.get(19)?,
      status:               row.get(20)?,
      created_at:           row.get(21)?,
      updated_at:           row.get(22)?,
      expires_at:           row.get(23)?,
      timer_started_at:     row.get(24)?,
      timer_duration_hours: row.get(25)?,
    })
  }

  pub fn into_entry(self) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
      id:                   decode_uuid(&self.id)?,
      source_type:          decode_source_type(&self.source_type)?,
      source_id:            self.source_id,
      canonical_url:        self.canonical_url,
      affiliate_url:        self.affiliate_url,
      network:              self.network,
      monetized:            self.monetized,
      title:                self.title,
      description:          self.description,
      image_url:            self.image_url,
      price:                self.price,
      original_price:       self.original_price,
      currency:             self.currency,
      rating:               self.rating,
      review_count:         self.review_count,
      discount_percent:     self.discount_percent,
      category:             self.category,
      content_type:         decode_content_type(&self.content_type)?,
      is_featured:          self.is_featured,
      display_pages:        decode_pages(&self.display_pages)?,
      status:               decode_status(&self.status)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      expires_at:           self.expires_at.as_deref().map(decode_dt).transpose()?,
      timer_started_at:     self
        .timer_started_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      timer_duration_hours: self.timer_duration_hours,
    })
  }
}
