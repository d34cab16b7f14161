//! URL resolution: shortened and redirector-wrapped links in, canonical
//! product-page URLs out.
//!
//! Two kinds of hop. Redirector hosts (CueLinks, EarnKaro and friends) embed
//! the destination in a query parameter, which we extract without touching
//! the network. Shorteners need a HEAD request with redirects disabled and a
//! read of the `Location` header. Hops of either kind count against
//! [`MAX_HOPS`].
//!
//! Resolution is best-effort by contract: whatever goes wrong, the caller
//! gets back the last URL seen (or the input itself) rather than an error.

use std::{
  collections::HashSet,
  future::Future,
  time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use trove_core::pipeline::{ResolutionMethod, ResolvedLink};
use url::Url;

use crate::Result;

/// Hard cap on redirect hops, matching what mainstream shorteners need in
/// practice while bounding pathological chains.
pub const MAX_HOPS: u32 = 10;

const DEFAULT_BUDGET: Duration = Duration::from_secs(20);

// ─── HopClient ───────────────────────────────────────────────────────────────

/// One network hop: ask where `url` redirects to, without following.
pub trait HopClient: Send + Sync {
  /// `Ok(None)` means the URL does not redirect (terminal).
  fn location_of<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl Future<Output = Result<Option<String>>> + Send + 'a;
}

/// Production hop client: HEAD with redirects disabled, read `Location`.
pub struct ReqwestHopClient {
  client: reqwest::Client,
}

impl ReqwestHopClient {
  pub fn new(per_hop_timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .timeout(per_hop_timeout)
      .user_agent(crate::extract::BROWSER_USER_AGENT)
      .build()?;
    Ok(Self { client })
  }
}

impl HopClient for ReqwestHopClient {
  fn location_of<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl Future<Output = Result<Option<String>>> + Send + 'a {
    async move {
      let resp = self.client.head(url.clone()).send().await?;
      if !resp.status().is_redirection() {
        return Ok(None);
      }
      Ok(
        resp
          .headers()
          .get(reqwest::header::LOCATION)
          .and_then(|v| v.to_str().ok())
          .map(str::to_owned),
      )
    }
  }
}

// ─── Redirector rules ────────────────────────────────────────────────────────

/// A known affiliate redirector: any URL on `host_suffix` carries its real
/// destination percent-encoded in the `param` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectorRule {
  pub host_suffix: String,
  pub param:       String,
}

impl RedirectorRule {
  /// The redirectors the ingestion sources actually emit.
  pub fn defaults() -> Vec<Self> {
    let rule = |host_suffix: &str, param: &str| Self {
      host_suffix: host_suffix.to_owned(),
      param:       param.to_owned(),
    };
    vec![
      rule("linksredirect.com", "url"),
      rule("clnk.in", "url"),
      rule("ekaro.in", "dl"),
    ]
  }
}

/// `host` equals `suffix` or is a subdomain of it.
pub(crate) fn host_matches(host: &str, suffix: &str) -> bool {
  match host.strip_suffix(suffix) {
    Some(rest) => rest.is_empty() || rest.ends_with('.'),
    None => false,
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

pub struct Resolver {
  rules:  Vec<RedirectorRule>,
  budget: Duration,
}

impl Default for Resolver {
  fn default() -> Self { Self::new(RedirectorRule::defaults(), DEFAULT_BUDGET) }
}

impl Resolver {
  pub fn new(rules: Vec<RedirectorRule>, budget: Duration) -> Self {
    Self { rules, budget }
  }

  /// Resolve `input` to its canonical URL. Never fails: the worst case is
  /// the (normalized) input handed back with [`ResolutionMethod::Direct`].
  pub async fn resolve(
    &self,
    client: &impl HopClient,
    input: &str,
  ) -> ResolvedLink {
    let started = Instant::now();
    let raw = normalize(input);

    let Ok(mut current) = Url::parse(&raw) else {
      tracing::debug!(url = %raw, "unparseable input url, passing through");
      return ResolvedLink {
        canonical_url: raw,
        hops_taken:    0,
        method:        ResolutionMethod::Direct,
      };
    };

    let mut hops = 0_u32;
    let mut used_param = false;
    let mut visited = HashSet::from([current.to_string()]);

    while hops < MAX_HOPS {
      if started.elapsed() >= self.budget {
        tracing::warn!(url = %current, hops, "resolution budget exhausted");
        break;
      }

      let next = if let Some(target) = self.embedded_target(&current) {
        used_param = true;
        target
      } else {
        match client.location_of(&current).await {
          Ok(Some(location)) => match current.join(&location) {
            Ok(next) => next,
            Err(err) => {
              tracing::debug!(%location, %err, "unusable Location header");
              break;
            }
          },
          Ok(None) => break,
          Err(err) => {
            tracing::debug!(url = %current, %err, "hop failed, keeping last url");
            break;
          }
        }
      };

      if !visited.insert(next.to_string()) {
        tracing::warn!(url = %next, "redirect cycle detected");
        break;
      }
      hops += 1;
      current = next;
    }

    let method = if used_param {
      ResolutionMethod::RedirectorParam
    } else if hops > 0 {
      ResolutionMethod::ShortenerExpand
    } else {
      ResolutionMethod::Direct
    };

    ResolvedLink {
      canonical_url: current.to_string(),
      hops_taken: hops,
      method,
    }
  }

  /// Destination embedded in a redirector's query parameter, if `url` is on
  /// a known redirector host.
  fn embedded_target(&self, url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    let rule = self
      .rules
      .iter()
      .find(|r| host_matches(host, &r.host_suffix))?;
    let (_, value) = url.query_pairs().find(|(k, _)| *k == rule.param)?;
    Url::parse(&value).ok()
  }
}

/// Trim and default to https; message text often carries bare domains.
fn normalize(input: &str) -> String {
  let trimmed = input.trim();
  if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
    trimmed.to_owned()
  } else {
    format!("https://{trimmed}")
  }
}
