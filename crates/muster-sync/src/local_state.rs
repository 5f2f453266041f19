//! The locally persisted marker of the dataset currently loaded.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::{Error, Result};

/// A file holding a single RFC 3339 timestamp and nothing else.
#[derive(Debug, Clone)]
pub struct LocalState {
  path: PathBuf,
}

impl LocalState {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }

  /// The stored marker. A missing file is `None`; so is an unreadable or
  /// garbled one, after a warning, which forces the next check to populate.
  pub async fn get(&self) -> Option<DateTime<Utc>> {
    let raw = match tokio::fs::read_to_string(&self.path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == ErrorKind::NotFound => return None,
      Err(error) => {
        warn!(path = %self.path.display(), %error, "failed to read local update marker");
        return None;
      }
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
      Ok(at) => Some(at.with_timezone(&Utc)),
      Err(error) => {
        warn!(path = %self.path.display(), %error, "ignoring unparseable local update marker");
        None
      }
    }
  }

  /// Overwrite the stored marker, creating parent directories as needed.
  pub async fn set(&self, marker: DateTime<Utc>) -> Result<()> {
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(parent, e))?;
    }
    let text = marker.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    tokio::fs::write(&self.path, &text)
      .await
      .map_err(|e| Error::io(&self.path, e))?;
    info!(marker = %text, "local update marker advanced");
    Ok(())
  }
}
