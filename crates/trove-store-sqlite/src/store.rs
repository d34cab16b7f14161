//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use trove_core::{
  click::{ClickEvent, ClickOutcome},
  entry::{CatalogEntry, EntryStatus, NewEntry, SourceType},
  store::{CatalogStore, UpsertAction, UpsertOutcome},
};

use crate::{
  encode::{
    RawEntry, decode_outcome, encode_content_type, encode_dt,
    encode_pages, encode_source_type, encode_status, encode_uuid,
  },
  schema, Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Trove catalog backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are serialised onto one connection thread, which is what makes the
/// lookup-then-write inside [`CatalogStore::upsert`] atomic under concurrent
/// ingestion.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        schema::migrate(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn one_entry(
    &self,
    sql: String,
    param: String,
  ) -> Result<Option<CatalogEntry>> {
    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawEntry::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }

  fn entry_sql(suffix: &str) -> String {
    format!("SELECT {} FROM entries {suffix}", RawEntry::COLUMNS)
  }
}

// ─── Encoded write payload ───────────────────────────────────────────────────

/// All of a [`NewEntry`]'s fields pre-encoded for binding, so the
/// `conn.call` closure stays free of fallible encoding.
struct EncodedEntry {
  source_type:          String,
  source_id:            Option<String>,
  canonical_url:        Option<String>,
  affiliate_url:        String,
  network:              Option<String>,
  monetized:            bool,
  title:                String,
  description:          Option<String>,
  image_url:            String,
  price:                Option<f64>,
  original_price:       Option<f64>,
  currency:             Option<String>,
  rating:               Option<f64>,
  review_count:         Option<u32>,
  discount_percent:     Option<u8>,
  category:             String,
  content_type:         String,
  is_featured:          bool,
  display_pages:        String,
  expires_at:           Option<String>,
  timer_started_at:     Option<String>,
  timer_duration_hours: Option<i64>,
}

impl EncodedEntry {
  fn from_new(entry: &NewEntry) -> Result<Self> {
    Ok(Self {
      source_type:          encode_source_type(entry.source_type).to_owned(),
      source_id:            entry.source_id.clone(),
      canonical_url:        entry.canonical_url.clone(),
      affiliate_url:        entry.affiliate_url.clone(),
      network:              entry.network.clone(),
      monetized:            entry.monetized,
      title:                entry.title.clone(),
      description:          entry.description.clone(),
      image_url:            entry.image_url.clone(),
      price:                entry.price,
      original_price:       entry.original_price,
      currency:             entry.currency.clone(),
      rating:               entry.rating,
      review_count:         entry.review_count,
      discount_percent:     entry.discount_percent,
      category:             entry.category.clone(),
      content_type:         encode_content_type(entry.content_type).to_owned(),
      is_featured:          entry.is_featured,
      display_pages:        encode_pages(&entry.display_pages)?,
      expires_at:           entry.expires_at.map(encode_dt),
      timer_started_at:     entry.timer_started_at.map(encode_dt),
      timer_duration_hours: entry.timer_duration_hours,
    })
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, entry: NewEntry) -> Result<UpsertOutcome> {
    entry.validate()?;

    let enc = EncodedEntry::from_new(&entry)?;
    let new_id = Uuid::new_v4();
    let new_id_str = encode_uuid(new_id);
    let now_str = encode_dt(Utc::now());
    let active = encode_status(EntryStatus::Active).to_owned();

    let (inserted, id_str): (bool, String) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Identity lookup: (source_type, source_id) first, then canonical
        // or affiliate URL.
        let mut existing: Option<String> = None;
        if let Some(sid) = &enc.source_id {
          existing = tx
            .query_row(
              "SELECT id FROM entries WHERE source_type = ?1 AND source_id = ?2",
              rusqlite::params![enc.source_type, sid],
              |r| r.get(0),
            )
            .optional()?;
        }
        if existing.is_none() {
          let url_key =
            enc.canonical_url.as_deref().unwrap_or(&enc.affiliate_url);
          existing = tx
            .query_row(
              "SELECT id FROM entries
                WHERE canonical_url = ?1 OR affiliate_url = ?1",
              rusqlite::params![url_key],
              |r| r.get(0),
            )
            .optional()?;
        }

        let result = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE entries SET
                 canonical_url = ?1, affiliate_url = ?2, network = ?3,
                 monetized = ?4, title = ?5, description = ?6,
                 image_url = ?7, price = ?8, original_price = ?9,
                 currency = ?10, rating = ?11, review_count = ?12,
                 discount_percent = ?13, category = ?14, content_type = ?15,
                 is_featured = ?16, display_pages = ?17, status = ?18,
                 updated_at = ?19, expires_at = ?20, timer_started_at = ?21,
                 timer_duration_hours = ?22
               WHERE id = ?23",
              rusqlite::params![
                enc.canonical_url,
                enc.affiliate_url,
                enc.network,
                enc.monetized,
                enc.title,
                enc.description,
                enc.image_url,
                enc.price,
                enc.original_price,
                enc.currency,
                enc.rating,
                enc.review_count,
                enc.discount_percent,
                enc.category,
                enc.content_type,
                enc.is_featured,
                enc.display_pages,
                active,
                now_str,
                enc.expires_at,
                enc.timer_started_at,
                enc.timer_duration_hours,
                id,
              ],
            )?;
            (false, id)
          }
          None => {
            tx.execute(
              "INSERT INTO entries (
                 id, source_type, source_id, canonical_url, affiliate_url,
                 network, monetized, title, description, image_url,
                 price, original_price, currency, rating, review_count,
                 discount_percent, category, content_type, is_featured,
                 display_pages, status, created_at, updated_at,
                 expires_at, timer_started_at, timer_duration_hours
               ) VALUES (
                 ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                 ?25, ?26
               )",
              rusqlite::params![
                new_id_str,
                enc.source_type,
                enc.source_id,
                enc.canonical_url,
                enc.affiliate_url,
                enc.network,
                enc.monetized,
                enc.title,
                enc.description,
                enc.image_url,
                enc.price,
                enc.original_price,
                enc.currency,
                enc.rating,
                enc.review_count,
                enc.discount_percent,
                enc.category,
                enc.content_type,
                enc.is_featured,
                enc.display_pages,
                active,
                now_str,
                now_str,
                enc.expires_at,
                enc.timer_started_at,
                enc.timer_duration_hours,
              ],
            )?;
            (true, new_id_str)
          }
        };

        tx.commit()?;
        Ok(result)
      })
      .await?;

    Ok(UpsertOutcome {
      action: if inserted {
        UpsertAction::Inserted
      } else {
        UpsertAction::Updated
      },
      id:     crate::encode::decode_uuid(&id_str)?,
    })
  }

  async fn entry(&self, id: Uuid) -> Result<Option<CatalogEntry>> {
    self
      .one_entry(Self::entry_sql("WHERE id = ?1"), encode_uuid(id))
      .await
  }

  async fn find_by_identity(
    &self,
    source_type: SourceType,
    source_id: &str,
  ) -> Result<Option<CatalogEntry>> {
    let st = encode_source_type(source_type).to_owned();
    let sid = source_id.to_owned();
    let sql = Self::entry_sql("WHERE source_type = ?1 AND source_id = ?2");
    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![st, sid], RawEntry::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }

  async fn find_by_url(&self, url: &str) -> Result<Option<CatalogEntry>> {
    if let Some(entry) = self
      .one_entry(Self::entry_sql("WHERE canonical_url = ?1"), url.to_owned())
      .await?
    {
      return Ok(Some(entry));
    }
    self
      .one_entry(Self::entry_sql("WHERE affiliate_url = ?1"), url.to_owned())
      .await
  }

  async fn set_status(&self, id: Uuid, status: EntryStatus) -> Result<()> {
    let id_str = encode_uuid(id);
    let status_str = encode_status(status).to_owned();
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE entries SET status = ?1, updated_at = ?2 WHERE id = ?3",
          rusqlite::params![status_str, now_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::EntryNotFound(id));
    }
    Ok(())
  }

  async fn entries_for_page(&self, page: &str) -> Result<Vec<CatalogEntry>> {
    // display_pages is a JSON array; match the quoted slug.
    let pattern = format!("%\"{page}\"%");

    let sql = Self::entry_sql(
      "WHERE status = 'active' AND display_pages LIKE ?1
       ORDER BY created_at DESC",
    );
    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn record_click(
    &self,
    entry_id: Uuid,
    outcome: ClickOutcome,
  ) -> Result<ClickEvent> {
    let event = ClickEvent {
      click_id: Uuid::new_v4(),
      entry_id,
      occurred_at: Utc::now(),
      outcome,
    };

    let click_id_str = encode_uuid(event.click_id);
    let entry_id_str = encode_uuid(event.entry_id);
    let at_str = encode_dt(event.occurred_at);
    let outcome_str = outcome.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clicks (click_id, entry_id, occurred_at, outcome)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![click_id_str, entry_id_str, at_str, outcome_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn click_counts(
    &self,
    entry_id: Uuid,
  ) -> Result<Vec<(ClickOutcome, u64)>> {
    let entry_id_str = encode_uuid(entry_id);

    let rows: Vec<(String, u64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT outcome, COUNT(*) FROM clicks
            WHERE entry_id = ?1 GROUP BY outcome",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![entry_id_str], |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(outcome, count)| Ok((decode_outcome(&outcome)?, count)))
      .collect()
  }
}
