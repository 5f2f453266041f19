//! The full rebuild: schema, download, then every table in dependency order.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use muster_core::tables::{
  DETACHMENTS_ABILITIES, ENHANCEMENTS, STRATAGEMS, Stage, Table, TableSpec, source_files,
  tables_in, validate_catalogue,
};
use muster_csv::Record;
use muster_store_sqlite::{LoadReport, SCHEMA, SqliteStore};
use tracing::info;

use crate::{Error, Result, remote::RemoteSource};

/// What a completed run loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationReport {
  /// One entry per CSV-backed table, in load order.
  pub tables:      Vec<LoadReport>,
  pub detachments: usize,
}

impl PopulationReport {
  pub fn inserted(&self) -> usize { self.tables.iter().map(|t| t.inserted).sum() }

  pub fn skipped(&self) -> usize { self.tables.iter().map(|t| t.skipped).sum() }

  pub fn table(&self, table: Table) -> Option<&LoadReport> {
    self.tables.iter().find(|t| t.table == table)
  }
}

/// Owns one population run against `store`.
pub struct Populator {
  store:    SqliteStore,
  remote:   RemoteSource,
  data_dir: PathBuf,
  schema:   String,
}

impl Populator {
  /// A populator applying the embedded [`SCHEMA`].
  pub fn new(store: SqliteStore, remote: RemoteSource, data_dir: impl Into<PathBuf>) -> Self {
    Self { store, remote, data_dir: data_dir.into(), schema: SCHEMA.to_owned() }
  }

  /// Replace the DDL applied at the start of each run.
  pub fn with_schema(mut self, ddl: impl Into<String>) -> Self {
    self.schema = ddl.into();
    self
  }

  pub fn store(&self) -> &SqliteStore { &self.store }

  pub fn data_dir(&self) -> &Path { &self.data_dir }

  /// Rebuild the dataset from the remote source.
  ///
  /// Any failure aborts the run where it stands. On success, foreign-key
  /// enforcement is back on and `marker`, if known, is recorded in the
  /// `last_update` table.
  pub async fn run(&self, marker: Option<DateTime<Utc>>) -> Result<PopulationReport> {
    info!("starting database population");
    validate_catalogue()?;

    info!(stage = %Stage::SchemaInit, "entering stage");
    self.store.apply_schema(self.schema.as_str()).await?;

    self.remote.fetch_all(&source_files(), &self.data_dir).await?;

    let report = self.load_from_dir().await?;

    self.store.set_foreign_keys(true).await?;
    if let Some(marker) = marker {
      self.store.record_last_update(marker).await?;
    }
    info!(
      stage = %Stage::Done,
      inserted = report.inserted(),
      skipped = report.skipped(),
      detachments = report.detachments,
      "database population finished"
    );
    Ok(report)
  }

  /// Load every table from the files already in the data directory, in
  /// stage order. The schema must have been applied.
  pub async fn load_from_dir(&self) -> Result<PopulationReport> {
    let mut report = PopulationReport::default();

    for stage in [Stage::Independent, Stage::UnitProfiles] {
      info!(%stage, "entering stage");
      for spec in tables_in(stage) {
        let records = self.read(spec).await?;
        report.tables.push(self.store.populate_table(spec, records).await?);
      }
    }

    info!(stage = %Stage::DeriveDetachments, "entering stage");
    let mut scoped: HashMap<Table, Vec<Record>> = HashMap::new();
    for spec in [&STRATAGEMS, &ENHANCEMENTS, &DETACHMENTS_ABILITIES] {
      scoped.insert(spec.table, self.read(spec).await?);
    }
    let sources: Vec<&[Record]> = scoped.values().map(Vec::as_slice).collect();
    let lookup = self.store.derive_detachments(&sources).await?;
    report.detachments = lookup.len();

    info!(stage = %Stage::DetachmentScoped, "entering stage");
    for spec in tables_in(Stage::DetachmentScoped) {
      let records = match scoped.remove(&spec.table) {
        Some(records) => records,
        None => self.read(spec).await?,
      };
      report
        .tables
        .push(self.store.populate_detachment_scoped(spec, records, &lookup).await?);
    }

    info!(stage = %Stage::CrossLinks, "entering stage");
    for spec in tables_in(Stage::CrossLinks) {
      let records = self.read(spec).await?;
      report.tables.push(self.store.populate_table(spec, records).await?);
    }

    Ok(report)
  }

  async fn read(&self, spec: &TableSpec) -> Result<Vec<Record>> {
    let path = self.data_dir.join(spec.source_file);
    let text = tokio::fs::read_to_string(&path)
      .await
      .map_err(|e| Error::io(&path, e))?;
    Ok(muster_csv::parse(&text)?)
  }
}
