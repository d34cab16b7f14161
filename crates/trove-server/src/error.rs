//! Server error type and [`axum::response::IntoResponse`] implementation.
//!
//! Only the ingestion endpoint surfaces errors as HTTP status codes; the
//! redirect path maps every failure to a safe fallback redirect instead.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("ingest error: {0}")]
  Ingest(#[from] trove_ingest::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    Self::Store(Box::new(err))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    tracing::error!(error = %self, "request failed");
    (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(json!({ "error": self.to_string() })),
    )
      .into_response()
  }
}
