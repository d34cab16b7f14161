//! The `Classifier` trait.
//!
//! Categorization is inherently heuristic, so it sits behind a small
//! interface: the keyword implementation in `trove-ingest` can later be
//! swapped for a learned model without touching the rest of the pipeline.

use crate::pipeline::CategoryAssignment;

/// Assign a category, content type and feature flags from listing text.
pub trait Classifier: Send + Sync {
  /// `channel` is an optional source-channel slug used as a baseline hint;
  /// keyword evidence may override it.
  fn classify(
    &self,
    title: &str,
    description: &str,
    channel: Option<&str>,
  ) -> CategoryAssignment;
}
