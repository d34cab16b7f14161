//! Error types for `trove-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("entry not found: {0}")]
  EntryNotFound(Uuid),

  #[error("validation failed: {0}")]
  Validation(#[from] crate::entry::ValidationError),

  #[error("unknown source type: {0:?}")]
  UnknownSourceType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
