//! The incremental-update decision.
//!
//! [`UpdateCoordinator`] compares the remote marker with the local one and
//! runs a full population only when the remote dataset is strictly newer.
//! The local marker moves only after a population succeeds, so a failed run
//! leaves the next check starting from the same baseline.

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
  Result,
  local_state::LocalState,
  orchestrator::{PopulationReport, Populator},
  remote::RemoteSource,
};

// ─── Seams ───────────────────────────────────────────────────────────────────

/// Where the remote freshness marker comes from.
pub trait MarkerSource: Send + Sync {
  /// `None` when the marker is unknown.
  fn remote_marker(&self) -> impl Future<Output = Option<DateTime<Utc>>> + Send + '_;
}

/// Something that can rebuild the dataset.
pub trait Population: Send + Sync {
  fn populate(
    &self,
    marker: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<PopulationReport>> + Send + '_;
}

impl MarkerSource for RemoteSource {
  async fn remote_marker(&self) -> Option<DateTime<Utc>> { self.fetch_remote_marker().await }
}

impl Population for Populator {
  async fn populate(&self, marker: Option<DateTime<Utc>>) -> Result<PopulationReport> {
    self.run(marker).await
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
  /// The remote marker could not be determined; nothing was touched.
  RemoteUnknown,
  /// The local dataset is at least as new as the remote one.
  UpToDate {
    local:  DateTime<Utc>,
    remote: DateTime<Utc>,
  },
  /// A population ran and the local marker now equals `marker`.
  Updated {
    marker: DateTime<Utc>,
    report: PopulationReport,
  },
}

pub struct UpdateCoordinator<R, P> {
  remote:    R,
  populator: P,
  local:     LocalState,
}

impl<R: MarkerSource, P: Population> UpdateCoordinator<R, P> {
  pub fn new(remote: R, populator: P, local: LocalState) -> Self {
    Self { remote, populator, local }
  }

  pub fn local_state(&self) -> &LocalState { &self.local }

  /// Run one update check.
  ///
  /// Population errors propagate and leave the local marker unchanged.
  pub async fn check_for_updates(&self) -> Result<UpdateOutcome> {
    info!("starting update check");

    let Some(remote) = self.remote.remote_marker().await else {
      info!("could not determine remote update marker, aborting");
      return Ok(UpdateOutcome::RemoteUnknown);
    };

    let local = self.local.get().await;
    if let Some(local) = local.filter(|local| remote <= *local) {
      info!(%local, %remote, "no new data, everything is up to date");
      return Ok(UpdateOutcome::UpToDate { local, remote });
    }

    info!(local = ?local, %remote, "new data found, populating");
    let report = self.populator.populate(Some(remote)).await?;
    self.local.set(remote).await?;

    info!("update check finished");
    Ok(UpdateOutcome::Updated { marker: remote, report })
  }
}
