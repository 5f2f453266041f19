//! Error types for `muster-core`.

use thiserror::Error;

use crate::tables::Table;

#[derive(Debug, Error)]
pub enum Error {
  /// The table has no converter set, so its rows cannot be loaded.
  #[error("no converters defined for table {0}")]
  MissingConverters(Table),

  #[error("unknown table: {0:?}")]
  UnknownTable(String),

  /// The table is not keyed by a single `id` column.
  #[error("table {0} has no single-column identifier")]
  NoIdentifier(Table),

  #[error("invalid table catalogue: {0}")]
  InvalidCatalogue(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
