//! Click events — the append-only record of redirect decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the redirect validator decided for one visitor click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickOutcome {
  /// The entry was live and the visitor was sent to the affiliate URL.
  Redirected,
  /// Expired by date, timer, or manual flag; visitor sent to the fallback.
  Expired,
  /// The affiliate URL failed its live-check; visitor sent to the fallback.
  Invalid,
  /// An internal failure; visitor still sent somewhere safe.
  Error,
}

impl ClickOutcome {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Redirected => "redirected",
      Self::Expired => "expired",
      Self::Invalid => "invalid",
      Self::Error => "error",
    }
  }
}

/// One recorded click. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
  pub click_id:    Uuid,
  pub entry_id:    Uuid,
  pub occurred_at: DateTime<Utc>,
  pub outcome:     ClickOutcome,
}
