//! The `DatasetStore` trait: the read-only surface the HTTP layer needs.
//!
//! Implemented by storage backends (e.g. `muster-store-sqlite`). The API crate
//! depends on this abstraction, not on a concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  model::{Faction, Row},
  tables::Table,
};

/// Read access to the currently loaded dataset.
pub trait DatasetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All factions, ordered by name.
  fn list_factions(
    &self,
  ) -> impl Future<Output = Result<Vec<Faction>, Self::Error>> + Send + '_;

  /// Fetch one row of `table` by its `id` column. Returns `None` if absent.
  ///
  /// Tables without a single-column identifier yield an error.
  fn get_by_id<'a>(
    &'a self,
    table: Table,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Row>, Self::Error>> + Send + 'a;

  /// The marker of the dataset currently loaded, if one was recorded.
  fn last_update(
    &self,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + '_;
}
