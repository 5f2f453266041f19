//! Keeps the local rules dataset in step with the published one.
//!
//! - [`remote::RemoteSource`] downloads the CSV files and the freshness
//!   marker, with bounded retries and a politeness delay between files.
//! - [`local_state::LocalState`] persists the marker of the loaded dataset.
//! - [`orchestrator::Populator`] rebuilds the SQLite store from scratch.
//! - [`update::UpdateCoordinator`] decides whether a rebuild is needed.

pub mod config;
pub mod error;
pub mod local_state;
pub mod orchestrator;
pub mod remote;
pub mod retry;
pub mod update;

pub use config::DownloadOptions;
pub use error::{Error, FailedDownload, Result};
pub use local_state::LocalState;
pub use orchestrator::{PopulationReport, Populator};
pub use remote::RemoteSource;
pub use update::{MarkerSource, Population, UpdateCoordinator, UpdateOutcome};

#[cfg(test)]
mod tests;
