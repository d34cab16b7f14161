//! Outbound request discipline: a bounded in-flight pool plus a keyed
//! per-host rate limiter, and a small bounded-retry helper.
//!
//! Storefronts ban aggressive scrapers; one request per host per window
//! keeps ingestion under their radar while the semaphore bounds total
//! concurrency.

use std::{future::Future, num::NonZeroU32, time::Duration};

use governor::{
  Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore,
};
use nonzero_ext::nonzero;
use tokio::sync::{Semaphore, SemaphorePermit};

type HostLimiter =
  RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub const DEFAULT_PER_HOST_PER_SECOND: u32 = 1;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

pub struct FetchGate {
  limiter: HostLimiter,
  permits: Semaphore,
}

impl Default for FetchGate {
  fn default() -> Self {
    Self::new(DEFAULT_PER_HOST_PER_SECOND, DEFAULT_MAX_IN_FLIGHT)
  }
}

impl FetchGate {
  pub fn new(per_host_per_second: u32, max_in_flight: usize) -> Self {
    let quota = Quota::per_second(
      NonZeroU32::new(per_host_per_second).unwrap_or(nonzero!(1_u32)),
    );
    Self {
      limiter: RateLimiter::keyed(quota),
      permits: Semaphore::new(max_in_flight),
    }
  }

  /// Wait for a pool slot, then for this host's rate window. The permit
  /// releases the pool slot on drop.
  pub async fn acquire(&self, host: &str) -> SemaphorePermit<'_> {
    let permit = self
      .permits
      .acquire()
      .await
      .expect("fetch gate semaphore is never closed");
    self.limiter.until_key_ready(&host.to_owned()).await;
    permit
  }
}

// ─── Retry ───────────────────────────────────────────────────────────────────

pub const MAX_ATTEMPTS: u32 = 2;
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Run `op` up to [`MAX_ATTEMPTS`] times, backing off exponentially, but
/// only for errors `is_transient` says are worth it.
pub async fn with_retry<T, E, F, Fut, P>(
  what: &str,
  is_transient: P,
  mut op: F,
) -> Result<T, E>
where
  E: std::fmt::Display,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  P: Fn(&E) -> bool,
{
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) if attempt < MAX_ATTEMPTS && is_transient(&err) => {
        tracing::debug!(what, attempt, %err, "transient failure, retrying");
        tokio::time::sleep(BACKOFF_BASE * 2_u32.pow(attempt - 1)).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}
