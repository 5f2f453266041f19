//! Loader for the pipe-delimited CSV dialect the rules dataset is published in.
//!
//! Pure synchronous; no HTTP or database dependencies. Values are trimmed,
//! empty cells become absent, and no type inference is attempted; coercion is
//! the converter registry's job.
//!
//! # Quick start
//!
//! ```no_run
//! let rows = muster_csv::parse("id|name|\nSM|Space Marines|\n").unwrap();
//! assert_eq!(rows[0].get("name"), Some("Space Marines"));
//! ```

pub mod error;
mod parse;

use std::{collections::HashMap, path::Path};

pub use error::{Error, Result};

// ─── Public types ───────────────────────────────────────────────────────────

/// One data row as header → value.
///
/// Only non-empty cells are stored, so an empty cell and a missing trailing
/// column both read back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
  fields: HashMap<String, String>,
}

impl Record {
  pub fn get(&self, header: &str) -> Option<&str> {
    self.fields.get(header).map(String::as_str)
  }

  /// Move the value stored under `from` to `to`. No-op if `from` is absent.
  pub fn rename(&mut self, from: &str, to: &str) {
    if let Some(v) = self.fields.remove(from) {
      self.fields.insert(to.to_owned(), v);
    }
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub(crate) fn insert(&mut self, header: &str, value: &str) {
    if !header.is_empty() && !value.is_empty() {
      self.fields.insert(header.to_owned(), value.to_owned());
    }
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut record = Record::default();
    for (k, v) in iter {
      record.insert(&k.into(), &v.into());
    }
    record
  }
}

// ─── Public API ─────────────────────────────────────────────────────────────

/// Parse `input` into rows, in file order.
pub fn parse(input: &str) -> Result<Vec<Record>> { parse::parse_str(input) }

/// Read and parse the file at `path`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Record>> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
    path: path.display().to_string(),
    source,
  })?;
  parse(&text)
}
