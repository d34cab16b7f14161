//! The Trove ingestion pipeline.
//!
//! Turns a raw sourced message (text plus maybe a URL) into a validated,
//! categorized, monetized [`trove_core::entry::NewEntry`] and upserts it
//! through a [`trove_core::store::CatalogStore`]. Stages are individually
//! testable: the network sits behind the [`resolve::HopClient`] and
//! [`extract::PageFetcher`] traits, everything else is pure.

#![allow(async_fn_in_trait)]

pub mod affiliate;
pub mod categorize;
pub mod error;
pub mod extract;
pub mod limit;
pub mod pipeline;
pub mod resolve;

pub use error::{Error, Result};
pub use pipeline::{IngestOutcome, IngestPipeline, PipelineConfig, WebClient};
