//! SQLite backend for the Muster rules dataset.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Besides the read side
//! ([`muster_core::store::DatasetStore`]) it owns the write side of a
//! population run: schema application, per-table bulk loads with foreign-key
//! filtering, and detachment derivation.

mod detachments;
mod encode;
mod populate;
mod schema;
mod store;

pub mod error;

pub use detachments::{DetachmentLookup, collect_pairs};
pub use error::{Error, Result};
pub use populate::{LoadReport, SkippedRow};
pub use schema::SCHEMA;
pub use store::SqliteStore;
