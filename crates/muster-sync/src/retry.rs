//! Bounded retry with a fixed delay.

use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

/// Run `op` up to `attempts` times (at least once), sleeping `delay` between
/// attempts. The error of the final attempt is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(
  what: &str,
  attempts: u32,
  delay: Duration,
  mut op: F,
) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  let attempts = attempts.max(1);
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(error) if attempt < attempts => {
        warn!(
          what,
          attempt,
          attempts,
          %error,
          delay_ms = delay.as_millis() as u64,
          "attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(error) => return Err(error),
    }
  }
}
