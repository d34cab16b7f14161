//! Affiliate link building.
//!
//! Network rules are configuration, not code: each rule names the hosts it
//! monetizes, the hosts that indicate a URL is already monetized, and how
//! the monetized URL is formed. Two styles exist in the wild — wrapper
//! networks (CueLinks, EarnKaro) that percent-encode the destination into
//! their own URL, and tag-parameter networks (Amazon Associates) that set an
//! id on the product URL itself.
//!
//! Building is idempotent: a URL already on a wrapped host is returned
//! unchanged, so re-ingesting an affiliate URL never double-wraps it.

use serde::{Deserialize, Serialize};
use trove_core::pipeline::AffiliateLink;
use url::Url;

use crate::resolve::host_matches;

// ─── Rules ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum LinkStyle {
  /// Destination percent-encoded into a wrapper URL. `{id}` and `{url}` are
  /// substituted.
  Wrapper { template: String },
  /// Affiliate id set as a query parameter on the product URL itself.
  TagParam { param: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRule {
  pub network:       String,
  /// Hosts whose URLs are already monetized for this network.
  #[serde(default)]
  pub wrapped_hosts: Vec<String>,
  /// Storefront hosts this rule monetizes. Empty matches any host, so
  /// catch-all rules belong after specific ones.
  #[serde(default)]
  pub match_hosts:   Vec<String>,
  #[serde(default)]
  pub affiliate_id:  String,
  pub style:         LinkStyle,
}

impl NetworkRule {
  pub fn defaults() -> Vec<Self> {
    vec![
      Self {
        network:       "amazon".to_owned(),
        wrapped_hosts: vec![],
        match_hosts:   vec!["amazon.in".to_owned(), "amazon.com".to_owned()],
        affiliate_id:  "trove-21".to_owned(),
        style:         LinkStyle::TagParam {
          param: "tag".to_owned(),
          value: "trove-21".to_owned(),
        },
      },
      Self {
        network:       "cuelinks".to_owned(),
        wrapped_hosts: vec![
          "linksredirect.com".to_owned(),
          "clnk.in".to_owned(),
        ],
        match_hosts:   vec![],
        affiliate_id:  "243942".to_owned(),
        style:         LinkStyle::Wrapper {
          template: "https://linksredirect.com/?cid={id}&source=linkkit&\
                     url={url}"
            .to_owned(),
        },
      },
      Self {
        network:       "earnkaro".to_owned(),
        wrapped_hosts: vec!["ekaro.in".to_owned()],
        match_hosts:   vec![],
        affiliate_id:  "4530348".to_owned(),
        style:         LinkStyle::Wrapper {
          template: "https://ekaro.in/enkr2020/?dl={url}&ref={id}".to_owned(),
        },
      },
    ]
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct LinkBuilder {
  rules: Vec<NetworkRule>,
}

impl Default for LinkBuilder {
  fn default() -> Self { Self::new(NetworkRule::defaults()) }
}

impl LinkBuilder {
  pub fn new(rules: Vec<NetworkRule>) -> Self { Self { rules } }

  /// Monetize `canonical`. First matching rule wins; no rule means the URL
  /// is carried through unmonetized rather than dropped.
  pub fn build(&self, canonical: &str) -> AffiliateLink {
    let passthrough = || AffiliateLink {
      monetized_url:   canonical.to_owned(),
      network:         None,
      already_wrapped: false,
    };

    let Ok(url) = Url::parse(canonical) else {
      return passthrough();
    };
    let Some(host) = url.host_str() else {
      return passthrough();
    };

    // Already on a network's own host: hand it back untouched.
    if let Some(rule) = self.rules.iter().find(|r| {
      r.wrapped_hosts.iter().any(|h| host_matches(host, h))
    }) {
      return AffiliateLink {
        monetized_url:   canonical.to_owned(),
        network:         Some(rule.network.clone()),
        already_wrapped: true,
      };
    }

    let Some(rule) = self.rules.iter().find(|r| {
      r.match_hosts.is_empty()
        || r.match_hosts.iter().any(|h| host_matches(host, h))
    }) else {
      return passthrough();
    };

    match &rule.style {
      LinkStyle::Wrapper { template } => AffiliateLink {
        monetized_url:   template
          .replace("{id}", &rule.affiliate_id)
          .replace("{url}", &urlencoding::encode(canonical)),
        network:         Some(rule.network.clone()),
        already_wrapped: false,
      },
      LinkStyle::TagParam { param, value } => {
        if url
          .query_pairs()
          .any(|(k, v)| k.as_ref() == param && v.as_ref() == value)
        {
          return AffiliateLink {
            monetized_url:   canonical.to_owned(),
            network:         Some(rule.network.clone()),
            already_wrapped: true,
          };
        }
        let mut monetized = url.clone();
        let kept: Vec<(String, String)> = url
          .query_pairs()
          .filter(|(k, _)| k != param.as_str())
          .map(|(k, v)| (k.into_owned(), v.into_owned()))
          .collect();
        monetized
          .query_pairs_mut()
          .clear()
          .extend_pairs(kept)
          .append_pair(param, value);
        AffiliateLink {
          monetized_url:   monetized.to_string(),
          network:         Some(rule.network.clone()),
          already_wrapped: false,
        }
      }
    }
  }
}
