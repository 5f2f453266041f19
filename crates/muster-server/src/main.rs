//! `muster` binary.
//!
//! Reads `muster.toml` (or the path given with `--config`) plus `MUSTER_*`
//! environment variables, then serves the API or refreshes the dataset.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use muster_server::Settings;
use muster_sync::{UpdateCoordinator, UpdateOutcome};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Muster rules dataset server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "muster.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the read-only JSON API.
  Serve,
  /// Download and load the whole dataset, unconditionally.
  Populate,
  /// Populate only if the remote dataset is newer than the loaded one.
  Update,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Serve => serve(&settings).await,
    Command::Populate => populate(&settings).await,
    Command::Update => update(&settings).await,
  }
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
  let store = muster_server::open_store(settings).await?;
  let app = muster_server::app(Arc::new(store));
  let address = settings.address();

  info!("listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn populate(settings: &Settings) -> anyhow::Result<()> {
  let remote = muster_server::remote_source(settings)?;
  let store = muster_server::open_store(settings).await?;
  let populator = muster_server::populator(settings, store, remote.clone()).await?;

  let marker = remote.fetch_remote_marker().await;
  let report = populator.run(marker).await.context("population failed")?;
  if let Some(marker) = marker {
    muster_server::local_state(settings).set(marker).await?;
  }
  info!(
    inserted = report.inserted(),
    skipped = report.skipped(),
    detachments = report.detachments,
    "population complete"
  );
  Ok(())
}

async fn update(settings: &Settings) -> anyhow::Result<()> {
  let remote = muster_server::remote_source(settings)?;
  let store = muster_server::open_store(settings).await?;
  let populator = muster_server::populator(settings, store, remote.clone()).await?;
  let coordinator =
    UpdateCoordinator::new(remote, populator, muster_server::local_state(settings));

  match coordinator.check_for_updates().await.context("update failed")? {
    UpdateOutcome::RemoteUnknown => info!("remote marker unknown, nothing done"),
    UpdateOutcome::UpToDate { local, .. } => info!(%local, "dataset is up to date"),
    UpdateOutcome::Updated { marker, report } => info!(
      %marker,
      inserted = report.inserted(),
      skipped = report.skipped(),
      "dataset updated"
    ),
  }
  Ok(())
}
