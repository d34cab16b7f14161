//! SQLite backend for the Trove catalog store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Because every call is serialised onto
//! that one connection, the upsert's lookup-then-write runs atomically with
//! respect to concurrent ingestion.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
