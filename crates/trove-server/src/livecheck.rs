//! Click-time liveness probe for affiliate destinations.
//!
//! Three-state result on purpose: a destination that answered with garbage
//! is dead, but a probe that never completed proves nothing. The validator
//! fails open on [`LiveStatus::Indeterminate`] so a hiccup on our side never
//! costs a commission.

use std::{future::Future, time::Duration};

use reqwest::StatusCode;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
  Reachable,
  Unreachable,
  /// The probe itself could not complete; says nothing about the target.
  Indeterminate,
}

pub trait LiveCheck: Send + Sync {
  fn check<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = LiveStatus> + Send + 'a;
}

/// HEAD probe with a short timeout, following redirects.
pub struct HttpLiveCheck {
  client: reqwest::Client,
}

impl HttpLiveCheck {
  pub fn new() -> reqwest::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(PROBE_TIMEOUT)
      .redirect(reqwest::redirect::Policy::limited(5))
      .user_agent(trove_ingest::extract::BROWSER_USER_AGENT)
      .build()?;
    Ok(Self { client })
  }
}

impl LiveCheck for HttpLiveCheck {
  fn check<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = LiveStatus> + Send + 'a {
    async move {
      match self.client.head(url).send().await {
        // Some storefronts reject HEAD outright; that is not a dead link.
        Ok(resp)
          if resp.status().is_success()
            || resp.status().is_redirection()
            || resp.status() == StatusCode::METHOD_NOT_ALLOWED =>
        {
          LiveStatus::Reachable
        }
        Ok(resp) => {
          tracing::debug!(url, status = %resp.status(), "probe got error status");
          LiveStatus::Unreachable
        }
        Err(err) if err.is_timeout() || err.is_connect() => {
          tracing::debug!(url, %err, "probe could not reach target");
          LiveStatus::Unreachable
        }
        Err(err) => {
          tracing::warn!(url, %err, "probe failed on our side");
          LiveStatus::Indeterminate
        }
      }
    }
  }
}
