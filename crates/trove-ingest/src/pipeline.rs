//! The ingestion pipeline: raw sourced message in, upserted catalog entry
//! out.
//!
//! Stage order is resolve → extract → monetize → classify → validate →
//! upsert. The early stages are best-effort and degrade; validation is the
//! gate that decides whether anything reaches storage. Abandoning a message
//! at any point leaves no partial rows behind.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trove_core::{
  classify::Classifier,
  entry::NewEntry,
  pipeline::RawInput,
  store::{CatalogStore, UpsertAction},
};
use url::Url;
use uuid::Uuid;

use crate::{
  Error, Result,
  affiliate::{LinkBuilder, NetworkRule},
  categorize::KeywordClassifier,
  extract::{self, PageFetcher},
  limit::{FetchGate, with_retry},
  resolve::{HopClient, RedirectorRule, Resolver},
};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Pipeline knobs, all with workable defaults. Deserialized as part of the
/// server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub enabled:             bool,
  pub redirectors:         Vec<RedirectorRule>,
  pub networks:            Vec<NetworkRule>,
  pub per_host_per_second: u32,
  pub max_in_flight:       usize,
  pub resolve_budget_secs: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      enabled:             true,
      redirectors:         RedirectorRule::defaults(),
      networks:            NetworkRule::defaults(),
      per_host_per_second: crate::limit::DEFAULT_PER_HOST_PER_SECOND,
      max_in_flight:       crate::limit::DEFAULT_MAX_IN_FLIGHT,
      resolve_budget_secs: 20,
    }
  }
}

// ─── Production network client ───────────────────────────────────────────────

/// Bundles the reqwest hop client and page fetcher into the single network
/// seam the pipeline wants.
pub struct WebClient {
  hops:  crate::resolve::ReqwestHopClient,
  pages: crate::extract::HttpFetcher,
}

impl WebClient {
  pub fn new() -> Result<Self> {
    Ok(Self {
      hops:  crate::resolve::ReqwestHopClient::new(Duration::from_secs(10))?,
      pages: crate::extract::HttpFetcher::new()?,
    })
  }
}

impl HopClient for WebClient {
  fn location_of<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl std::future::Future<Output = Result<Option<String>>> + Send + 'a
  {
    self.hops.location_of(url)
  }
}

impl PageFetcher for WebClient {
  fn fetch_page<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl std::future::Future<Output = Result<String>> + Send + 'a {
    self.pages.fetch_page(url)
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
  /// Ingestion is disabled by configuration.
  Skipped,
  Stored { action: UpsertAction, id: Uuid },
  /// The input could not be turned into a valid entry; nothing was written.
  Rejected { reason: String },
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct IngestPipeline<S, N> {
  store:      S,
  net:        N,
  resolver:   Resolver,
  links:      LinkBuilder,
  classifier: KeywordClassifier,
  gate:       FetchGate,
  enabled:    bool,
}

impl<S, N> IngestPipeline<S, N>
where
  S: CatalogStore,
  N: HopClient + PageFetcher,
{
  pub fn new(store: S, net: N, config: PipelineConfig) -> Self {
    Self {
      store,
      net,
      resolver: Resolver::new(
        config.redirectors,
        Duration::from_secs(config.resolve_budget_secs),
      ),
      links: LinkBuilder::new(config.networks),
      classifier: KeywordClassifier::new(),
      gate: FetchGate::new(config.per_host_per_second, config.max_in_flight),
      enabled: config.enabled,
    }
  }

  /// Run one input through the whole pipeline.
  pub async fn ingest(&self, input: RawInput) -> Result<IngestOutcome> {
    if !self.enabled {
      tracing::debug!("ingestion disabled, skipping input");
      return Ok(IngestOutcome::Skipped);
    }

    let Some(raw_url) = input.url.clone().or_else(|| first_url(&input.text))
    else {
      return Ok(IngestOutcome::Rejected {
        reason: "no url in input".to_owned(),
      });
    };

    let resolved = self.resolver.resolve(&self.net, &raw_url).await;
    tracing::debug!(
      from = %raw_url,
      to = %resolved.canonical_url,
      hops = resolved.hops_taken,
      method = ?resolved.method,
      "resolved url"
    );

    let canonical = resolved.canonical_url;
    let Ok(url) = Url::parse(&canonical) else {
      return Ok(IngestOutcome::Rejected {
        reason: format!("unusable url: {canonical}"),
      });
    };

    let page = match self.fetch_page(&url).await {
      Some(html) => extract::extract_from_html(&html, &url),
      None => Default::default(),
    };
    let snapshot = extract::complete(page, &input.text, &url);

    let link = self.links.build(&canonical);

    // Classify over everything we have: deal language often lives in the
    // message, not on the product page.
    let classify_text = match &snapshot.description {
      Some(d) => format!("{d}\n{}", input.text),
      None => input.text.clone(),
    };
    let assignment = self.classifier.classify(
      snapshot.title.as_deref().unwrap_or(""),
      &classify_text,
      input.channel.as_deref(),
    );
    tracing::debug!(
      category = %assignment.category,
      content_type = ?assignment.content_type,
      confidence = assignment.confidence,
      "classified"
    );

    // The storefront domain beats the keyword fallback, nothing else.
    let category = if assignment.category == "General" {
      snapshot
        .category_hint
        .clone()
        .unwrap_or(assignment.category)
    } else {
      assignment.category
    };

    // Manual entries keep the operator's page choice; automated sources get
    // the classifier's assignments merged in.
    let display_pages = if !input.source_type.is_automated()
      && !input.display_pages.is_empty()
    {
      input.display_pages.clone()
    } else {
      merge_pages(&input.display_pages, assignment.display_pages)
    };

    let entry = NewEntry {
      source_type:          input.source_type,
      source_id:            input.source_id.clone(),
      canonical_url:        Some(canonical.clone()),
      affiliate_url:        link.monetized_url,
      monetized:            link.network.is_some(),
      network:              link.network,
      title:                snapshot.title.clone().unwrap_or_default(),
      description:          snapshot.description.clone(),
      image_url:            snapshot.image_url.clone().unwrap_or_default(),
      price:                snapshot.price,
      original_price:       snapshot.original_price,
      currency:             snapshot.currency.clone(),
      rating:               snapshot.rating,
      review_count:         snapshot.review_count,
      discount_percent:     snapshot.discount_percent(),
      category,
      content_type:         assignment.content_type,
      is_featured:          assignment.is_featured,
      display_pages,
      expires_at:           None,
      timer_started_at:     None,
      timer_duration_hours: None,
    };

    if let Err(err) = entry.validate() {
      tracing::warn!(%err, url = %canonical, "rejecting entry");
      return Ok(IngestOutcome::Rejected { reason: err.to_string() });
    }

    let outcome = self.store.upsert(entry).await.map_err(Error::store)?;
    tracing::info!(
      action = outcome.action.as_str(),
      id = %outcome.id,
      url = %canonical,
      "entry stored"
    );
    Ok(IngestOutcome::Stored { action: outcome.action, id: outcome.id })
  }

  /// Gated, retried page fetch. `None` means extraction falls back to the
  /// message text.
  async fn fetch_page(&self, url: &Url) -> Option<String> {
    let host = url.host_str().unwrap_or_default();
    let _permit = self.gate.acquire(host).await;

    let fetched = with_retry("product page", Error::is_transient, move || {
      self.net.fetch_page(url)
    })
    .await;

    match fetched {
      Ok(html) => Some(html),
      Err(err) => {
        tracing::warn!(%url, %err, "page fetch failed, using text fallback");
        None
      }
    }
  }
}

fn first_url(text: &str) -> Option<String> {
  text
    .split_whitespace()
    .find(|t| {
      t.starts_with("http://")
        || t.starts_with("https://")
        || t.starts_with("www.")
    })
    .map(|t| t.trim_end_matches([',', '.', ';', '!', '?', ')']).to_owned())
}

fn merge_pages(requested: &[String], assigned: Vec<String>) -> Vec<String> {
  let mut pages = requested.to_vec();
  for page in assigned {
    if !pages.contains(&page) {
      pages.push(page);
    }
  }
  pages
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    future::Future,
    sync::{Arc, Mutex},
  };

  use chrono::Utc;
  use trove_core::{
    click::{ClickEvent, ClickOutcome},
    entry::{CatalogEntry, ContentType, EntryStatus, SourceType},
    store::UpsertOutcome,
  };

  use super::*;

  // ─── In-memory store ───────────────────────────────────────────────────

  #[derive(Clone, Default)]
  struct MemStore {
    entries: Arc<Mutex<Vec<CatalogEntry>>>,
  }

  impl MemStore {
    fn all(&self) -> Vec<CatalogEntry> {
      self.entries.lock().unwrap().clone()
    }
  }

  fn materialize(new: NewEntry) -> CatalogEntry {
    let now = Utc::now();
    CatalogEntry {
      id:                   Uuid::new_v4(),
      source_type:          new.source_type,
      source_id:            new.source_id,
      canonical_url:        new.canonical_url,
      affiliate_url:        new.affiliate_url,
      network:              new.network,
      monetized:            new.monetized,
      title:                new.title,
      description:          new.description,
      image_url:            new.image_url,
      price:                new.price,
      original_price:       new.original_price,
      currency:             new.currency,
      rating:               new.rating,
      review_count:         new.review_count,
      discount_percent:     new.discount_percent,
      category:             new.category,
      content_type:         new.content_type,
      is_featured:          new.is_featured,
      display_pages:        new.display_pages,
      status:               EntryStatus::Active,
      created_at:           now,
      updated_at:           now,
      expires_at:           new.expires_at,
      timer_started_at:     new.timer_started_at,
      timer_duration_hours: new.timer_duration_hours,
    }
  }

  impl CatalogStore for MemStore {
    type Error = Infallible;

    fn upsert(
      &self,
      entry: NewEntry,
    ) -> impl Future<Output = Result<UpsertOutcome, Infallible>> + Send + '_
    {
      async move {
        let mut entries = self.entries.lock().unwrap();
        let existing = entries.iter_mut().find(|e| {
          (entry.source_id.is_some() && e.source_id == entry.source_id)
            || (entry.canonical_url.is_some()
              && e.canonical_url == entry.canonical_url)
        });
        match existing {
          Some(e) => {
            e.title = entry.title;
            e.status = EntryStatus::Active;
            Ok(UpsertOutcome { action: UpsertAction::Updated, id: e.id })
          }
          None => {
            let row = materialize(entry);
            let id = row.id;
            entries.push(row);
            Ok(UpsertOutcome { action: UpsertAction::Inserted, id })
          }
        }
      }
    }

    fn entry(
      &self,
      id: Uuid,
    ) -> impl Future<Output = Result<Option<CatalogEntry>, Infallible>> + Send + '_
    {
      async move {
        Ok(self.entries.lock().unwrap().iter().find(|e| e.id == id).cloned())
      }
    }

    fn find_by_identity<'a>(
      &'a self,
      source_type: SourceType,
      source_id: &'a str,
    ) -> impl Future<Output = Result<Option<CatalogEntry>, Infallible>> + Send + 'a
    {
      async move {
        Ok(
          self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
              e.source_type == source_type
                && e.source_id.as_deref() == Some(source_id)
            })
            .cloned(),
        )
      }
    }

    fn find_by_url<'a>(
      &'a self,
      url: &'a str,
    ) -> impl Future<Output = Result<Option<CatalogEntry>, Infallible>> + Send + 'a
    {
      async move {
        Ok(
          self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
              e.canonical_url.as_deref() == Some(url)
                || e.affiliate_url == url
            })
            .cloned(),
        )
      }
    }

    fn set_status(
      &self,
      id: Uuid,
      status: EntryStatus,
    ) -> impl Future<Output = Result<(), Infallible>> + Send + '_ {
      async move {
        if let Some(e) =
          self.entries.lock().unwrap().iter_mut().find(|e| e.id == id)
        {
          e.status = status;
        }
        Ok(())
      }
    }

    fn entries_for_page<'a>(
      &'a self,
      page: &'a str,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, Infallible>> + Send + 'a
    {
      async move {
        Ok(
          self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
              e.status == EntryStatus::Active
                && e.display_pages.iter().any(|p| p == page)
            })
            .cloned()
            .collect(),
        )
      }
    }

    fn record_click(
      &self,
      entry_id: Uuid,
      outcome: ClickOutcome,
    ) -> impl Future<Output = Result<ClickEvent, Infallible>> + Send + '_ {
      async move {
        Ok(ClickEvent {
          click_id: Uuid::new_v4(),
          entry_id,
          occurred_at: Utc::now(),
          outcome,
        })
      }
    }

    fn click_counts(
      &self,
      _entry_id: Uuid,
    ) -> impl Future<Output = Result<Vec<(ClickOutcome, u64)>, Infallible>> + Send + '_
    {
      async move { Ok(vec![]) }
    }
  }

  // ─── Stub network ──────────────────────────────────────────────────────

  struct StubNet {
    html: Option<&'static str>,
  }

  impl HopClient for StubNet {
    fn location_of<'a>(
      &'a self,
      _url: &'a Url,
    ) -> impl Future<Output = Result<Option<String>>> + Send + 'a {
      async move { Ok(None) }
    }
  }

  impl PageFetcher for StubNet {
    fn fetch_page<'a>(
      &'a self,
      _url: &'a Url,
    ) -> impl Future<Output = Result<String>> + Send + 'a {
      async move {
        match self.html {
          Some(html) => Ok(html.to_owned()),
          None => Err(Error::url("down", url::ParseError::EmptyHost)),
        }
      }
    }
  }

  fn pipeline(
    store: MemStore,
    html: Option<&'static str>,
    enabled: bool,
  ) -> IngestPipeline<MemStore, StubNet> {
    let config = PipelineConfig {
      enabled,
      per_host_per_second: 100,
      ..Default::default()
    };
    IngestPipeline::new(store, StubNet { html }, config)
  }

  fn telegram_input(text: &str) -> RawInput {
    RawInput {
      text:          text.to_owned(),
      url:           None,
      source_type:   SourceType::Telegram,
      source_id:     Some("msg-1".to_owned()),
      channel:       None,
      display_pages: vec![],
    }
  }

  const PRODUCT_PAGE: &str = r#"
    <html><head>
      <meta property="og:title" content="boAt Airdopes 141 TWS Earbuds"/>
      <meta property="og:image" content="https://cdn.example/airdopes.jpg"/>
    </head><body>
      <div class="price">₹1,099</div>
      <del>₹4,490</del>
    </body></html>"#;

  #[tokio::test]
  async fn disabled_pipeline_skips() {
    let p = pipeline(MemStore::default(), Some(PRODUCT_PAGE), false);
    let outcome =
      p.ingest(telegram_input("https://shop.example/p/1")).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Skipped);
    assert!(p.store.all().is_empty());
  }

  #[tokio::test]
  async fn message_with_wrapped_url_is_stored() {
    let store = MemStore::default();
    let p = pipeline(store.clone(), Some(PRODUCT_PAGE), true);

    let text = "🔥 Deal!\nhttps://linksredirect.com/?cid=1&url=https%3A%2F%2Fwww.flipkart.com%2Fairdopes%2Fp%2F9";
    let outcome = p.ingest(telegram_input(text)).await.unwrap();

    let IngestOutcome::Stored { action, id } = outcome else {
      panic!("expected stored outcome, got {outcome:?}");
    };
    assert_eq!(action, UpsertAction::Inserted);

    let entries = store.all();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.id, id);
    assert_eq!(e.title, "boAt Airdopes 141 TWS Earbuds");
    assert_eq!(
      e.canonical_url.as_deref(),
      Some("https://www.flipkart.com/airdopes/p/9")
    );
    // Re-monetized through the wrapper network.
    assert!(e.affiliate_url.starts_with("https://linksredirect.com/"));
    assert!(e.monetized);
    assert_eq!(e.network.as_deref(), Some("cuelinks"));
    assert_eq!(e.price, Some(1099.0));
    assert_eq!(e.original_price, Some(4490.0));
    assert_eq!(e.discount_percent, Some(76));
    assert!(e.display_pages.contains(&"home".to_owned()));
    // "Deal" in the message title marks it featured.
    assert!(e.is_featured);
  }

  #[tokio::test]
  async fn fetch_failure_falls_back_to_text() {
    let store = MemStore::default();
    let p = pipeline(store.clone(), None, true);

    let text =
      "Noise Smartwatch at ₹1,499\nhttps://www.unknownshop.example/watch-x";
    let outcome = p.ingest(telegram_input(text)).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Stored { .. }));

    let e = &store.all()[0];
    assert_eq!(e.title, "Noise Smartwatch at ₹1,499");
    assert_eq!(e.price, Some(1499.0));
    assert!(e.image_url.starts_with("https://via.placeholder.com/"));
    assert_eq!(e.category, "Electronics & Gadgets");
  }

  #[tokio::test]
  async fn input_without_url_is_rejected() {
    let p = pipeline(MemStore::default(), None, true);
    let outcome = p.ingest(telegram_input("just words")).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Rejected { .. }));
  }

  #[tokio::test]
  async fn reingestion_updates_existing_entry() {
    let store = MemStore::default();
    let p = pipeline(store.clone(), Some(PRODUCT_PAGE), true);

    let text = "https://www.flipkart.com/airdopes/p/9";
    let first = p.ingest(telegram_input(text)).await.unwrap();
    let second = p.ingest(telegram_input(text)).await.unwrap();

    let IngestOutcome::Stored { action: a1, id: id1 } = first else {
      panic!()
    };
    let IngestOutcome::Stored { action: a2, id: id2 } = second else {
      panic!()
    };
    assert_eq!(a1, UpsertAction::Inserted);
    assert_eq!(a2, UpsertAction::Updated);
    assert_eq!(id1, id2);
    assert_eq!(store.all().len(), 1);
  }

  #[tokio::test]
  async fn manual_source_keeps_operator_pages() {
    let store = MemStore::default();
    let p = pipeline(store.clone(), Some(PRODUCT_PAGE), true);

    let input = RawInput {
      text:          String::new(),
      url:           Some("https://www.flipkart.com/airdopes/p/9".to_owned()),
      source_type:   SourceType::Manual,
      source_id:     Some("op-1".to_owned()),
      channel:       None,
      display_pages: vec!["top-picks".to_owned()],
    };
    p.ingest(input).await.unwrap();

    let e = &store.all()[0];
    assert_eq!(e.display_pages, vec!["top-picks".to_owned()]);
    assert_eq!(e.content_type, ContentType::Product);
  }
}
