//! Download tuning knobs.

use std::time::Duration;

/// Retry, rate-limit and timeout settings for the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
  /// Attempts per request, including the first. Zero is treated as one.
  pub max_retries: u32,
  /// Fixed wait between attempts.
  pub retry_delay: Duration,
  /// Wait after each successful download in a batch.
  pub rate_limit:  Duration,
  /// Per-request timeout.
  pub timeout:     Duration,
}

impl Default for DownloadOptions {
  fn default() -> Self {
    Self {
      max_retries: 3,
      retry_delay: Duration::from_millis(1000),
      rate_limit:  Duration::from_millis(200),
      timeout:     Duration::from_millis(5000),
    }
  }
}
