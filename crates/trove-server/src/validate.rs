//! Click-time validation: decide where a visitor goes before they go there.
//!
//! Check order is cheapest-first: absolute expiry, countdown timer, the
//! stored status, and only then a live probe of the destination. A dead or
//! missing offer sends the visitor to the site with an explanatory query
//! flag; this path never answers with a 4xx or 5xx.

use chrono::Utc;
use trove_core::{
  click::ClickOutcome,
  entry::EntryStatus,
  store::CatalogStore,
};
use uuid::Uuid;

use crate::livecheck::{LiveCheck, LiveStatus};

/// Where a click ends up. Every variant is a 302 somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickDecision {
  /// Send the visitor to the monetized destination.
  Redirect { id: Uuid, url: String },
  Expired { id: Uuid, title: String },
  Invalid { id: Uuid, title: String },
  NotFound,
  /// Storage failed; the visitor still gets a redirect, not a 500.
  Error,
}

impl ClickDecision {
  /// Outcome to log against the entry, when there is one.
  pub fn click_outcome(&self) -> Option<(Uuid, ClickOutcome)> {
    match self {
      Self::Redirect { id, .. } => Some((*id, ClickOutcome::Redirected)),
      Self::Expired { id, .. } => Some((*id, ClickOutcome::Expired)),
      Self::Invalid { id, .. } => Some((*id, ClickOutcome::Invalid)),
      Self::NotFound | Self::Error => None,
    }
  }
}

pub async fn decide<S, L>(store: &S, live: &L, id: Uuid) -> ClickDecision
where
  S: CatalogStore,
  L: LiveCheck,
{
  let entry = match store.entry(id).await {
    Ok(Some(entry)) => entry,
    Ok(None) => return ClickDecision::NotFound,
    Err(err) => {
      tracing::error!(%id, %err, "entry lookup failed");
      return ClickDecision::Error;
    }
  };

  let now = Utc::now();

  if entry.expires_at.is_some_and(|at| at <= now) {
    mark(store, id, EntryStatus::Expired).await;
    return ClickDecision::Expired { id, title: entry.title };
  }

  if entry.timer_deadline().is_some_and(|at| at <= now) {
    mark(store, id, EntryStatus::Expired).await;
    return ClickDecision::Expired { id, title: entry.title };
  }

  match entry.status {
    EntryStatus::Expired => {
      return ClickDecision::Expired { id, title: entry.title };
    }
    EntryStatus::Invalid => {
      return ClickDecision::Invalid { id, title: entry.title };
    }
    EntryStatus::Active => {}
  }

  match live.check(&entry.affiliate_url).await {
    LiveStatus::Reachable => {
      ClickDecision::Redirect { id, url: entry.affiliate_url }
    }
    LiveStatus::Unreachable => {
      mark(store, id, EntryStatus::Invalid).await;
      ClickDecision::Invalid { id, title: entry.title }
    }
    LiveStatus::Indeterminate => {
      // The probe proved nothing; redirecting is the cheaper mistake.
      tracing::warn!(%id, "live check indeterminate, redirecting anyway");
      ClickDecision::Redirect { id, url: entry.affiliate_url }
    }
  }
}

/// Status writes on the click path are best-effort; the visitor's redirect
/// must not depend on them.
async fn mark<S: CatalogStore>(store: &S, id: Uuid, status: EntryStatus) {
  if let Err(err) = store.set_status(id, status).await {
    tracing::warn!(%id, ?status, %err, "failed to update entry status");
  }
}

/// Build the site fallback URL for a non-redirectable click.
pub fn fallback_url(site_url: &str, flag: &str, title: Option<&str>) -> String {
  let base = site_url.trim_end_matches('/');
  match title {
    Some(title) => {
      format!("{base}?{flag}=true&title={}", urlencoding::encode(title))
    }
    None => format!("{base}?{flag}=true"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fallback_urls_are_flagged_and_encoded() {
    assert_eq!(
      fallback_url("https://site.example/", "expired", Some("Deal #1 (hot)")),
      "https://site.example?expired=true&title=Deal%20%231%20%28hot%29"
    );
    assert_eq!(
      fallback_url("https://site.example", "notfound", None),
      "https://site.example?notfound=true"
    );
  }
}
