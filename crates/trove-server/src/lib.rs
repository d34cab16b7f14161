//! HTTP surface for the Trove catalog.
//!
//! Exposes an axum [`Router`] with the ingestion entry point, the validated
//! click redirect, and a liveness probe, backed by any
//! [`trove_core::store::CatalogStore`]. The network seams
//! ([`trove_ingest::resolve::HopClient`], [`trove_ingest::extract::PageFetcher`]
//! and [`livecheck::LiveCheck`]) are generic so the whole router can be
//! exercised offline.

pub mod error;
pub mod handlers;
pub mod livecheck;
pub mod validate;

pub use error::Error;

use std::{any::Any, path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::{StatusCode, header},
  response::IntoResponse,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use trove_core::store::CatalogStore;
use trove_ingest::{
  IngestPipeline, PipelineConfig, extract::PageFetcher, resolve::HopClient,
};

use livecheck::LiveCheck;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` plus
/// `TROVE_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// Public site URL; fallback redirects for dead offers land here.
  pub site_url:   String,
  pub store_path: PathBuf,
  pub ingest:     PipelineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      site_url:   "http://localhost:8080".to_owned(),
      store_path: PathBuf::from("trove.db"),
      ingest:     PipelineConfig::default(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: CatalogStore, N, L> {
  pub store:    Arc<S>,
  pub pipeline: Arc<IngestPipeline<S, N>>,
  pub live:     Arc<L>,
  pub config:   Arc<ServerConfig>,
}

impl<S: CatalogStore, N, L> Clone for AppState<S, N, L> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      pipeline: Arc::clone(&self.pipeline),
      live:     Arc::clone(&self.live),
      config:   Arc::clone(&self.config),
    }
  }
}

impl<S, N, L> AppState<S, N, L>
where
  S: CatalogStore + Clone,
  N: HopClient + PageFetcher,
  L: LiveCheck,
{
  pub fn new(store: S, net: N, live: L, config: ServerConfig) -> Self {
    Self {
      pipeline: Arc::new(IngestPipeline::new(
        store.clone(),
        net,
        config.ingest.clone(),
      )),
      store:    Arc::new(store),
      live:     Arc::new(live),
      config:   Arc::new(config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<S, N, L>(state: AppState<S, N, L>) -> Router
where
  S: CatalogStore + Clone + 'static,
  N: HopClient + PageFetcher + 'static,
  L: LiveCheck + 'static,
{
  let site = state.config.site_url.clone();
  Router::new()
    .route(
      "/redirect/{kind}/{id}",
      get(handlers::redirect::handler::<S, N, L>),
    )
    // Even a panic on the click path owes the visitor a redirect.
    .route_layer(CatchPanicLayer::custom(
      move |err: Box<dyn Any + Send + 'static>| {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
          s.clone()
        } else if let Some(s) = err.downcast_ref::<&str>() {
          (*s).to_owned()
        } else {
          "unknown panic".to_owned()
        };
        tracing::error!(%detail, "panic on click path");
        (
          StatusCode::FOUND,
          [(header::LOCATION, validate::fallback_url(&site, "error", None))],
        )
          .into_response()
      },
    ))
    .route("/healthz", get(healthz))
    .route("/api/ingest", post(handlers::ingest::handler::<S, N, L>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> &'static str { "ok" }

// ─── Integration tests ───────────────────────────────────────────────────────
