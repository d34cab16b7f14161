//! Error type for `trove-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid url {url:?}: {source}")]
  Url {
    url:    String,
    source: url::ParseError,
  },

  /// The backing store failed. Validation rejections are not errors; they
  /// surface as [`crate::pipeline::IngestOutcome::Rejected`].
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn url(url: impl Into<String>, source: url::ParseError) -> Self {
    Self::Url { url: url.into(), source }
  }

  pub fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    Self::Store(Box::new(err))
  }

  /// Worth a second attempt: timeouts, connection drops and server-side
  /// failures. Client errors and parse failures are structural and final.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Http(e) => {
        e.is_timeout()
          || e.is_connect()
          || e.status().is_some_and(|s| s.is_server_error())
      }
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
