//! Wiring for the `muster` binary: settings, the HTTP app and the
//! population components built from them.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use muster_store_sqlite::{SCHEMA, SqliteStore};
use muster_sync::{DownloadOptions, LocalState, Populator, RemoteSource};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Environment variable consulted for the encoded remote base when the
/// settings do not carry one.
pub const REMOTE_ENV: &str = "REMOTE";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `muster.toml` and `MUSTER_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Where downloaded CSV files are written.
  pub data_dir:       PathBuf,
  /// The local update marker file.
  pub marker_path:    PathBuf,
  /// DDL applied at the start of each population; the embedded schema when
  /// absent.
  pub schema_path:    Option<PathBuf>,
  /// Base64-encoded remote base URL.
  pub remote:         Option<String>,
  pub max_retries:    u32,
  pub retry_delay_ms: u64,
  pub rate_limit_ms:  u64,
  pub timeout_ms:     u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      host:           "127.0.0.1".to_owned(),
      port:           3000,
      store_path:     PathBuf::from("data/muster.db"),
      data_dir:       PathBuf::from("data"),
      marker_path:    PathBuf::from("data/last_update.local"),
      schema_path:    None,
      remote:         None,
      max_retries:    3,
      retry_delay_ms: 1000,
      rate_limit_ms:  200,
      timeout_ms:     5000,
    }
  }
}

impl Settings {
  /// Layer `path` (optional) under `MUSTER_*` environment variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("MUSTER").try_parsing(true))
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn download_options(&self) -> DownloadOptions {
    DownloadOptions {
      max_retries: self.max_retries,
      retry_delay: Duration::from_millis(self.retry_delay_ms),
      rate_limit:  Duration::from_millis(self.rate_limit_ms),
      timeout:     Duration::from_millis(self.timeout_ms),
    }
  }

  /// The encoded remote base: the `remote` setting, else `$REMOTE`.
  pub fn encoded_remote(&self) -> Option<String> {
    self
      .remote
      .clone()
      .or_else(|| std::env::var(REMOTE_ENV).ok())
  }

  /// The DDL to apply: `schema_path` if set, else the embedded schema.
  pub async fn schema(&self) -> anyhow::Result<String> {
    match &self.schema_path {
      Some(path) => {
        let path = expand_tilde(path);
        tokio::fs::read_to_string(&path)
          .await
          .with_context(|| format!("failed to read schema at {path:?}"))
      }
      None => Ok(SCHEMA.to_owned()),
    }
  }
}

// ─── Components ───────────────────────────────────────────────────────────────

/// Open the SQLite store, creating its directory if needed.
pub async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&settings.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

pub fn remote_source(settings: &Settings) -> anyhow::Result<RemoteSource> {
  let encoded = settings.encoded_remote();
  RemoteSource::new(encoded.as_deref(), settings.download_options())
    .context("invalid remote source configuration")
}

pub async fn populator(
  settings: &Settings,
  store: SqliteStore,
  remote: RemoteSource,
) -> anyhow::Result<Populator> {
  let schema = settings.schema().await?;
  Ok(Populator::new(store, remote, expand_tilde(&settings.data_dir)).with_schema(schema))
}

pub fn local_state(settings: &Settings) -> LocalState {
  LocalState::new(expand_tilde(&settings.marker_path))
}

/// The HTTP application: the API nested under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>) -> Router {
  Router::new()
    .nest("/api", muster_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
