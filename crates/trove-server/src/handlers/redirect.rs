//! `GET /redirect/{kind}/{id}` — the click path.
//!
//! Validates the entry and 302s the visitor somewhere sensible, whatever
//! happens. The `kind` segment names the page the click came from and is
//! recorded in the logs only.

use axum::{
  extract::{Path, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use trove_core::store::CatalogStore;
use trove_ingest::{extract::PageFetcher, resolve::HopClient};
use uuid::Uuid;

use crate::{
  AppState,
  livecheck::LiveCheck,
  validate::{self, ClickDecision},
};

pub async fn handler<S, N, L>(
  State(state): State<AppState<S, N, L>>,
  Path((kind, id)): Path<(String, String)>,
) -> Response
where
  S: CatalogStore + Clone,
  N: HopClient + PageFetcher,
  L: LiveCheck,
{
  let site = &state.config.site_url;

  let Ok(id) = Uuid::parse_str(&id) else {
    tracing::debug!(kind, id, "malformed redirect id");
    return found(&validate::fallback_url(site, "notfound", None));
  };

  let decision =
    validate::decide(state.store.as_ref(), state.live.as_ref(), id).await;
  tracing::info!(kind, %id, decision = ?decision, "click");

  // Click logging never blocks the redirect.
  if let Some((entry_id, outcome)) = decision.click_outcome() {
    if let Err(err) = state.store.record_click(entry_id, outcome).await {
      tracing::warn!(%entry_id, %err, "failed to record click");
    }
  }

  match decision {
    ClickDecision::Redirect { url, .. } => found(&url),
    ClickDecision::Expired { title, .. } => {
      found(&validate::fallback_url(site, "expired", Some(&title)))
    }
    ClickDecision::Invalid { title, .. } => {
      found(&validate::fallback_url(site, "invalid", Some(&title)))
    }
    ClickDecision::NotFound => {
      found(&validate::fallback_url(site, "notfound", None))
    }
    ClickDecision::Error => {
      found(&validate::fallback_url(site, "error", None))
    }
  }
}

/// Plain 302; affiliate networks expect `Found`, not 307/303.
fn found(url: &str) -> Response {
  (StatusCode::FOUND, [(header::LOCATION, url.to_owned())]).into_response()
}
