//! `POST /api/ingest` — hand a sourced message to the pipeline.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use trove_core::{pipeline::RawInput, store::CatalogStore};
use trove_ingest::{
  IngestOutcome,
  extract::PageFetcher,
  resolve::HopClient,
};

use crate::{AppState, error::Error, livecheck::LiveCheck};

/// Accepts the raw-input JSON shape and answers with what the pipeline did:
/// `{ok, action, id}` on success, 422 `{ok:false, reason}` when the input
/// could not become a valid entry, `{skipped:true}` when ingestion is off.
pub async fn handler<S, N, L>(
  State(state): State<AppState<S, N, L>>,
  Json(input): Json<RawInput>,
) -> Result<Response, Error>
where
  S: CatalogStore + Clone,
  N: HopClient + PageFetcher,
  L: LiveCheck,
{
  match state.pipeline.ingest(input).await? {
    IngestOutcome::Skipped => {
      Ok(Json(json!({ "skipped": true })).into_response())
    }
    IngestOutcome::Stored { action, id } => Ok(
      Json(json!({ "ok": true, "action": action.as_str(), "id": id }))
        .into_response(),
    ),
    IngestOutcome::Rejected { reason } => Ok(
      (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "ok": false, "reason": reason })),
      )
        .into_response(),
    ),
  }
}
