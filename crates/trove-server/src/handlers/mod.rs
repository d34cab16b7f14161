//! HTTP handlers.

pub mod ingest;
pub mod redirect;
