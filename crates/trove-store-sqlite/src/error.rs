//! Error type for `trove-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] trove_core::Error),

  /// The entry failed mandatory-field validation and nothing was written.
  #[error("rejected: {0}")]
  Validation(#[from] trove_core::entry::ValidationError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("stored value could not be decoded: {0}")]
  Decode(String),

  #[error("entry not found: {0}")]
  EntryNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
