//! HTTP client for the published dataset.
//!
//! The base location arrives base64-encoded and is decoded once, in
//! [`RemoteSource::new`]. File URLs are the decoded base with the file name
//! appended verbatim, so the base normally ends in `/`.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDateTime, Utc};
use muster_core::tables::MARKER_FILE;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::{error, info, warn};

use crate::{
  Error, FailedDownload, Result,
  config::DownloadOptions,
  retry::with_retry,
};

/// The content type every dataset file must be served with.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct RemoteSource {
  client:   Client,
  base_url: String,
  options:  DownloadOptions,
}

impl RemoteSource {
  /// Decode `encoded` and build a client. A missing or empty value is
  /// [`Error::MissingRemote`].
  pub fn new(encoded: Option<&str>, options: DownloadOptions) -> Result<Self> {
    let encoded = encoded
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or(Error::MissingRemote)?;
    let bytes = STANDARD
      .decode(encoded)
      .map_err(|e| Error::InvalidRemote(e.to_string()))?;
    let base_url = String::from_utf8(bytes).map_err(|e| Error::InvalidRemote(e.to_string()))?;
    Self::from_base_url(base_url.trim(), options)
  }

  /// Build a client for an already-decoded base URL.
  pub fn from_base_url(base_url: impl Into<String>, options: DownloadOptions) -> Result<Self> {
    let base_url = base_url.into();
    if base_url.is_empty() {
      return Err(Error::MissingRemote);
    }
    let client = Client::builder().timeout(options.timeout).build()?;
    Ok(Self { client, base_url, options })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  pub fn options(&self) -> &DownloadOptions { &self.options }

  pub fn url(&self, file: &str) -> String { format!("{}{file}", self.base_url) }

  // ── Requests ──────────────────────────────────────────────────────────────

  /// One attempt: non-2xx and a non-CSV content type are both failures.
  async fn get_csv_once(&self, url: &str) -> Result<String> {
    let resp = self.client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { url: url.to_owned(), status });
    }

    let content_type = resp
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);
    if !content_type.as_deref().is_some_and(|ct| ct.contains(CSV_CONTENT_TYPE)) {
      return Err(Error::UnexpectedContentType {
        url:      url.to_owned(),
        found:    content_type,
        expected: CSV_CONTENT_TYPE,
      });
    }

    Ok(resp.text().await?)
  }

  /// Fetch `file` as text, retrying per [`DownloadOptions`].
  pub async fn get_csv(&self, file: &str) -> Result<String> {
    let url = self.url(file);
    with_retry(file, self.options.max_retries, self.options.retry_delay, || {
      self.get_csv_once(&url)
    })
    .await
  }

  // ── Operations ────────────────────────────────────────────────────────────

  /// The remote freshness marker, or `None` when it cannot be fetched or
  /// parsed. Never an error: an unknown marker means "do not update".
  pub async fn fetch_remote_marker(&self) -> Option<DateTime<Utc>> {
    info!(url = %self.url(MARKER_FILE), "fetching remote update marker");
    let text = match self.get_csv(MARKER_FILE).await {
      Ok(text) => text,
      Err(error) => {
        warn!(%error, "failed to fetch remote update marker");
        return None;
      }
    };
    let marker = parse_marker(&text);
    match marker {
      Some(at) => info!(marker = %at, "remote update marker"),
      None => warn!(content = %text.trim(), "remote update marker is malformed"),
    }
    marker
  }

  /// Download every file in `files` into `dest`, one at a time.
  ///
  /// Each file is attempted independently; if any of them fails every retry,
  /// the call fails with [`Error::BatchFailed`] listing all failures once the
  /// whole batch has been attempted.
  pub async fn fetch_all(&self, files: &[&str], dest: &Path) -> Result<()> {
    if files.is_empty() {
      return Err(Error::EmptyBatch);
    }
    tokio::fs::create_dir_all(dest)
      .await
      .map_err(|e| Error::io(dest, e))?;

    let mut failed = Vec::new();
    for &file in files {
      info!(file, "downloading");
      let path = dest.join(file);
      let outcome = match self.get_csv(file).await {
        Ok(body) => tokio::fs::write(&path, body).await.map_err(|e| Error::io(&path, e)),
        Err(e) => Err(e),
      };
      match outcome {
        Ok(()) => {
          info!(file, "downloaded");
          tokio::time::sleep(self.options.rate_limit).await;
        }
        Err(e) => {
          error!(file, error = %e, "download failed");
          failed.push(FailedDownload { file: file.to_owned(), reason: e.to_string() });
        }
      }
    }

    let total = files.len();
    info!(succeeded = total - failed.len(), total, "download summary");
    if failed.is_empty() { Ok(()) } else { Err(Error::BatchFailed { failed, total }) }
  }
}

// ─── Marker parsing ──────────────────────────────────────────────────────────

/// Extract the marker from the text of the marker file.
///
/// Lines are split on `|`, cells trimmed, and empty cells and lines dropped;
/// the marker is the first cell of the second remaining line. Accepts RFC 3339
/// or a naive `YYYY-MM-DD HH:MM:SS`, read as UTC.
pub fn parse_marker(text: &str) -> Option<DateTime<Utc>> {
  let lines: Vec<Vec<&str>> = text
    .split('\n')
    .map(|line| line.split('|').map(str::trim).filter(|c| !c.is_empty()).collect::<Vec<_>>())
    .filter(|cells| !cells.is_empty())
    .collect();
  let raw = lines.get(1)?.first()?;
  parse_timestamp(raw)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
    .ok()
    .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
  use base64::Engine as _;
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn marker_is_second_line_first_cell() {
    let at = parse_marker("header\n2024-05-01T00:00:00Z").unwrap();
    assert_eq!(at, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn marker_tolerates_pipes_crlf_and_blank_lines() {
    let at = parse_marker("last_update|\r\n\r\n 2024-05-01 12:30:00 |\r\n").unwrap();
    assert_eq!(at, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
  }

  #[test]
  fn malformed_markers_are_none() {
    assert!(parse_marker("header\n").is_none());
    assert!(parse_marker("").is_none());
    assert!(parse_marker("header\nnot a date\n").is_none());
  }

  #[test]
  fn missing_remote_is_fatal() {
    let opts = DownloadOptions::default();
    assert!(matches!(RemoteSource::new(None, opts), Err(Error::MissingRemote)));
    assert!(matches!(RemoteSource::new(Some("  "), opts), Err(Error::MissingRemote)));
    assert!(matches!(RemoteSource::new(Some("!!!"), opts), Err(Error::InvalidRemote(_))));
  }

  #[test]
  fn base_is_decoded_once() {
    let encoded = STANDARD.encode("https://data.example.test/csv/");
    let remote = RemoteSource::new(Some(encoded.as_str()), DownloadOptions::default()).unwrap();
    assert_eq!(remote.base_url(), "https://data.example.test/csv/");
    assert_eq!(remote.url("Factions.csv"), "https://data.example.test/csv/Factions.csv");
  }
}
