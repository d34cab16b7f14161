//! The `CatalogStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `trove-store-sqlite`).
//! Pipeline and HTTP layers depend on this abstraction, not on any concrete
//! backend, so each can be tested in isolation.

use std::future::Future;

use uuid::Uuid;

use crate::{
  click::{ClickEvent, ClickOutcome},
  entry::{CatalogEntry, EntryStatus, NewEntry, SourceType},
};

// ─── Upsert result ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
  Inserted,
  Updated,
}

impl UpsertAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Inserted => "insert",
      Self::Updated => "update",
    }
  }
}

/// What an upsert did, and to which row.
#[derive(Debug, Clone, Copy)]
pub struct UpsertOutcome {
  pub action: UpsertAction,
  pub id:     Uuid,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Trove catalog backend.
///
/// `upsert` is the single write path for ingestion and must be atomic with
/// respect to concurrent ingestion of the same identity: two near-simultaneous
/// upserts of one `(source_type, source_id)` must never produce two active
/// rows — the second writer observes and updates the first writer's row.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded async runtime (tokio with axum).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Validate `entry`, then insert it or overwrite the existing row with the
  /// same identity. An update resets the status to [`EntryStatus::Active`].
  fn upsert(
    &self,
    entry: NewEntry,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Retrieve an entry by id. Returns `None` if not found.
  fn entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  /// Look up by the `(source_type, source_id)` identity key.
  fn find_by_identity<'a>(
    &'a self,
    source_type: SourceType,
    source_id: &'a str,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + 'a;

  /// Look up by canonical URL first, then affiliate URL.
  fn find_by_url<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + 'a;

  /// Overwrite the lifecycle status. Used by the redirect validator to mark
  /// entries expired or invalid as a side effect of a failed live-check.
  fn set_status(
    &self,
    id: Uuid,
    status: EntryStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All active entries assigned to `page`, newest first.
  fn entries_for_page<'a>(
    &'a self,
    page: &'a str,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + 'a;

  /// Append a click event. The store assigns id and timestamp.
  fn record_click(
    &self,
    entry_id: Uuid,
    outcome: ClickOutcome,
  ) -> impl Future<Output = Result<ClickEvent, Self::Error>> + Send + '_;

  /// Per-outcome click totals for one entry.
  fn click_counts(
    &self,
    entry_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(ClickOutcome, u64)>, Self::Error>> + Send + '_;
}
