//! Versioned SQL schema for the Trove SQLite store.
//!
//! Migrations are applied at connection startup, gated on
//! `PRAGMA user_version`: each pending step runs inside its own transaction
//! and bumps the version on commit. This is the single place schema changes
//! are allowed to happen — no runtime ALTER TABLE patching anywhere else.

/// Ordered migration steps. `user_version` equals the number of steps
/// already applied.
pub const MIGRATIONS: &[&str] = &[
  // v1 — initial schema.
  "
  CREATE TABLE entries (
      id                   TEXT PRIMARY KEY,
      source_type          TEXT NOT NULL,   -- 'telegram' | 'rss' | 'api' | 'manual'
      source_id            TEXT,
      canonical_url        TEXT,
      affiliate_url        TEXT NOT NULL,
      network              TEXT,
      monetized            INTEGER NOT NULL DEFAULT 0,
      title                TEXT NOT NULL,
      description          TEXT,
      image_url            TEXT NOT NULL,
      price                REAL,
      original_price       REAL,
      currency             TEXT,
      rating               REAL,
      review_count         INTEGER,
      discount_percent     INTEGER,
      category             TEXT NOT NULL,
      content_type         TEXT NOT NULL,   -- 'product' | 'service' | 'app'
      is_featured          INTEGER NOT NULL DEFAULT 0,
      display_pages        TEXT NOT NULL,   -- JSON array of page slugs
      status               TEXT NOT NULL,   -- 'active' | 'expired' | 'invalid'
      created_at           TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
      updated_at           TEXT NOT NULL,
      expires_at           TEXT,
      timer_started_at     TEXT,
      timer_duration_hours INTEGER
  );

  -- Exactly one row per source identity; upsert updates in place.
  CREATE UNIQUE INDEX entries_identity_idx
      ON entries(source_type, source_id) WHERE source_id IS NOT NULL;

  -- Secondary lookup for URL-keyed identity and click-path reads.
  CREATE INDEX entries_canonical_idx ON entries(canonical_url);
  CREATE INDEX entries_affiliate_idx ON entries(affiliate_url);
  CREATE INDEX entries_status_idx    ON entries(status);

  -- Clicks are strictly append-only.
  -- No UPDATE or DELETE is ever issued against this table.
  CREATE TABLE clicks (
      click_id    TEXT PRIMARY KEY,
      entry_id    TEXT NOT NULL REFERENCES entries(id),
      occurred_at TEXT NOT NULL,
      outcome     TEXT NOT NULL    -- 'redirected' | 'expired' | 'invalid' | 'error'
  );

  CREATE INDEX clicks_entry_idx ON clicks(entry_id);
  ",
];

/// Run all migrations past the connection's current `user_version`.
pub fn migrate(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;

  let mut version: usize =
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

  while version < MIGRATIONS.len() {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(MIGRATIONS[version])?;
    version += 1;
    tx.pragma_update(None, "user_version", version as i64)?;
    tx.commit()?;
  }

  Ok(())
}
