//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use trove_core::{
  click::ClickOutcome,
  entry::{ContentType, EntryStatus, NewEntry, SourceType},
  store::{CatalogStore, UpsertAction},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn entry(source_id: &str) -> NewEntry {
  NewEntry {
    source_type:          SourceType::Telegram,
    source_id:            Some(source_id.into()),
    canonical_url:        Some(format!("https://shop.example/item/{source_id}")),
    affiliate_url:        format!(
      "https://linksredirect.com/?cid=1&url=https%3A%2F%2Fshop.example%2Fitem%2F{source_id}"
    ),
    network:              Some("cuelinks".into()),
    monetized:            true,
    title:                format!("Item {source_id}"),
    description:          None,
    image_url:            "https://shop.example/img.jpg".into(),
    price:                Some(999.0),
    original_price:       Some(1999.0),
    currency:             Some("INR".into()),
    rating:               Some(4.2),
    review_count:         Some(150),
    discount_percent:     Some(50),
    category:             "General".into(),
    content_type:         ContentType::Product,
    is_featured:          false,
    display_pages:        vec!["home".into()],
    expires_at:           None,
    timer_started_at:     None,
    timer_duration_hours: None,
  }
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_fetch_by_id() {
  let s = store().await;

  let outcome = s.upsert(entry("42")).await.unwrap();
  assert_eq!(outcome.action, UpsertAction::Inserted);

  let fetched = s.entry(outcome.id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Item 42");
  assert_eq!(fetched.status, EntryStatus::Active);
  assert_eq!(fetched.price, Some(999.0));
  assert_eq!(fetched.display_pages, vec!["home".to_string()]);
}

#[tokio::test]
async fn same_identity_updates_in_place() {
  let s = store().await;

  let first = s.upsert(entry("42")).await.unwrap();

  let mut second = entry("42");
  second.title = "Item 42 (restocked)".into();
  second.price = Some(899.0);
  let outcome = s.upsert(second).await.unwrap();

  assert_eq!(outcome.action, UpsertAction::Updated);
  assert_eq!(outcome.id, first.id);

  let fetched = s.entry(first.id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Item 42 (restocked)");
  assert_eq!(fetched.price, Some(899.0));
}

#[tokio::test]
async fn reingestion_resets_status_to_active() {
  let s = store().await;

  let outcome = s.upsert(entry("42")).await.unwrap();
  s.set_status(outcome.id, EntryStatus::Expired).await.unwrap();

  s.upsert(entry("42")).await.unwrap();
  let fetched = s.entry(outcome.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, EntryStatus::Active);
}

#[tokio::test]
async fn url_is_identity_when_source_id_is_absent() {
  let s = store().await;

  let mut first = entry("7");
  first.source_id = None;
  let inserted = s.upsert(first.clone()).await.unwrap();
  assert_eq!(inserted.action, UpsertAction::Inserted);

  // Same canonical URL arrives again without a source id.
  first.title = "Item 7 again".into();
  let outcome = s.upsert(first).await.unwrap();
  assert_eq!(outcome.action, UpsertAction::Updated);
  assert_eq!(outcome.id, inserted.id);
}

#[tokio::test]
async fn concurrent_upserts_of_one_identity_yield_one_row() {
  let s = store().await;

  let (a, b) = tokio::join!(s.upsert(entry("42")), s.upsert(entry("42")));
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_eq!(a.id, b.id);
  // One of the two must have observed the other's row.
  let actions = [a.action, b.action];
  assert!(actions.contains(&UpsertAction::Inserted));
  assert!(actions.contains(&UpsertAction::Updated));
}

#[tokio::test]
async fn invalid_entry_is_rejected_not_stored() {
  let s = store().await;

  let mut bad = entry("42");
  bad.title = "   ".into();
  let err = s.upsert(bad).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  // Nothing was written.
  let found = s
    .find_by_identity(SourceType::Telegram, "42")
    .await
    .unwrap();
  assert!(found.is_none());
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_identity_and_url() {
  let s = store().await;
  let outcome = s.upsert(entry("42")).await.unwrap();

  let by_identity = s
    .find_by_identity(SourceType::Telegram, "42")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_identity.id, outcome.id);

  let by_canonical = s
    .find_by_url("https://shop.example/item/42")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_canonical.id, outcome.id);

  let by_affiliate = s
    .find_by_url(&by_canonical.affiliate_url)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_affiliate.id, outcome.id);

  let missing = s.find_by_url("https://shop.example/item/404").await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn entry_missing_returns_none() {
  let s = store().await;
  assert!(s.entry(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn entries_for_page_filters_page_and_status() {
  let s = store().await;

  let mut featured = entry("1");
  featured.display_pages = vec!["home".into(), "top-picks".into()];
  s.upsert(featured).await.unwrap();

  s.upsert(entry("2")).await.unwrap();

  let expired = s.upsert(entry("3")).await.unwrap();
  s.set_status(expired.id, EntryStatus::Expired).await.unwrap();

  let home = s.entries_for_page("home").await.unwrap();
  assert_eq!(home.len(), 2);

  let picks = s.entries_for_page("top-picks").await.unwrap();
  assert_eq!(picks.len(), 1);
  assert_eq!(picks[0].title, "Item 1");
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_status_marks_entry() {
  let s = store().await;
  let outcome = s.upsert(entry("42")).await.unwrap();

  s.set_status(outcome.id, EntryStatus::Invalid).await.unwrap();
  let fetched = s.entry(outcome.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, EntryStatus::Invalid);
}

#[tokio::test]
async fn set_status_unknown_id_errors() {
  let s = store().await;
  let err = s
    .set_status(Uuid::new_v4(), EntryStatus::Expired)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EntryNotFound(_)));
}

// ─── Clicks ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clicks_append_and_aggregate() {
  let s = store().await;
  let outcome = s.upsert(entry("42")).await.unwrap();

  s.record_click(outcome.id, ClickOutcome::Redirected)
    .await
    .unwrap();
  s.record_click(outcome.id, ClickOutcome::Redirected)
    .await
    .unwrap();
  let event = s
    .record_click(outcome.id, ClickOutcome::Expired)
    .await
    .unwrap();
  assert_eq!(event.entry_id, outcome.id);
  assert!(event.occurred_at <= Utc::now());

  let mut counts = s.click_counts(outcome.id).await.unwrap();
  counts.sort_by_key(|(_, n)| *n);
  assert_eq!(counts, vec![
    (ClickOutcome::Expired, 1),
    (ClickOutcome::Redirected, 2),
  ]);
}

#[tokio::test]
async fn timer_fields_round_trip() {
  let s = store().await;

  let mut timed = entry("9");
  let started = Utc::now();
  timed.timer_started_at = Some(started);
  timed.timer_duration_hours = Some(6);
  let outcome = s.upsert(timed).await.unwrap();

  let fetched = s.entry(outcome.id).await.unwrap().unwrap();
  assert_eq!(fetched.timer_duration_hours, Some(6));
  let deadline = fetched.timer_deadline().unwrap();
  assert!(deadline > started);
}
