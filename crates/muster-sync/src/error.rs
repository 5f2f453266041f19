//! Error type for `muster-sync`.

use std::fmt;

use thiserror::Error;

/// One file of a download batch that failed every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
  pub file:   String,
  pub reason: String,
}

impl fmt::Display for FailedDownload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.file, self.reason)
  }
}

fn list_failures(failed: &[FailedDownload]) -> String {
  failed.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("remote base location is not configured")]
  MissingRemote,

  #[error("remote base location is not valid base64-encoded UTF-8: {0}")]
  InvalidRemote(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {url} returned {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("GET {url} returned content type {found:?}, expected {expected}")]
  UnexpectedContentType {
    url:      String,
    found:    Option<String>,
    expected: &'static str,
  },

  #[error("no files requested for download")]
  EmptyBatch,

  #[error("{} of {total} downloads failed: {}", .failed.len(), list_failures(.failed))]
  BatchFailed {
    failed: Vec<FailedDownload>,
    total:  usize,
  },

  #[error("io error at {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },

  #[error("csv error: {0}")]
  Csv(#[from] muster_csv::Error),

  #[error("store error: {0}")]
  Store(#[from] muster_store_sqlite::Error),

  #[error("core error: {0}")]
  Core(#[from] muster_core::Error),
}

impl Error {
  pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
    Self::Io { path: path.display().to_string(), source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn batch_failure_lists_every_file() {
    let err = Error::BatchFailed {
      failed: vec![
        FailedDownload { file: "Abilities.csv".into(), reason: "timed out".into() },
        FailedDownload { file: "Source.csv".into(), reason: "404".into() },
      ],
      total:  18,
    };
    assert_eq!(
      err.to_string(),
      "2 of 18 downloads failed: Abilities.csv: timed out; Source.csv: 404"
    );
  }
}
