//! Table population: header renames, conversion, foreign-key filtering and a
//! single-transaction bulk insert per table.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use muster_core::{
  Value,
  tables::{DETACHMENT_FACTION_HEADER, DETACHMENT_NAME_HEADER, Table, TableSpec},
};
use muster_csv::Record;
use tracing::{debug, info, warn};

use crate::{
  DetachmentLookup, Error, Result, SqliteStore,
  encode::{decode_value, encode_value, insert_or_replace_sql, quote_ident},
};

/// Column added in front of a detachment-scoped table's own columns.
const DETACHMENT_ID_COLUMN: &str = "detachment_id";

// ─── Reports ─────────────────────────────────────────────────────────────────

/// A row dropped because one of its foreign keys named no loaded parent row.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
  /// The foreign-key column that failed.
  pub column: &'static str,
  pub value:  Value,
  /// The converted row, column by column.
  pub row:    Vec<(&'static str, Value)>,
}

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
  pub table:        Table,
  pub inserted:     usize,
  pub skipped:      usize,
  pub skipped_rows: Vec<SkippedRow>,
}

impl LoadReport {
  fn empty(table: Table) -> Self {
    Self { table, inserted: 0, skipped: 0, skipped_rows: Vec::new() }
  }
}

// ─── Pure helpers ────────────────────────────────────────────────────────────

/// A pre-fetched parent key set bound to one column of the child row.
pub(crate) struct KeyCheck {
  pub index:  usize,
  pub column: &'static str,
  pub parent: Table,
  pub valid:  Arc<HashSet<Value>>,
}

pub(crate) fn convert_record(spec: &TableSpec, record: &Record) -> Vec<Value> {
  spec.columns.iter().map(|c| c.convert.apply(record.get(c.name))).collect()
}

/// The first check whose column holds a non-null value missing from its
/// parent's key set. A null foreign key never violates.
pub(crate) fn first_violation<'a>(row: &[Value], checks: &'a [KeyCheck]) -> Option<&'a KeyCheck> {
  checks.iter().find(|check| {
    let value = &row[check.index];
    !value.is_null() && !check.valid.contains(value)
  })
}

// ─── Store methods ───────────────────────────────────────────────────────────

impl SqliteStore {
  /// Load `records` into `spec.table` with insert-or-replace semantics.
  ///
  /// Rows whose foreign keys reference missing parents are dropped and
  /// reported. Inserts run in one transaction. Zero input rows is a no-op.
  pub async fn populate_table(
    &self,
    spec: &'static TableSpec,
    records: Vec<Record>,
  ) -> Result<LoadReport> {
    self.load(spec, records, None).await
  }

  /// Like [`populate_table`](Self::populate_table), additionally resolving
  /// each row's `(faction_id, detachment)` text pair through `detachments`
  /// into a `detachment_id` column. Unresolvable pairs become `NULL`.
  pub async fn populate_detachment_scoped(
    &self,
    spec: &'static TableSpec,
    records: Vec<Record>,
    detachments: &DetachmentLookup,
  ) -> Result<LoadReport> {
    self.load(spec, records, Some(detachments)).await
  }

  async fn load(
    &self,
    spec: &'static TableSpec,
    mut records: Vec<Record>,
    detachments: Option<&DetachmentLookup>,
  ) -> Result<LoadReport> {
    let table = spec.table;
    if records.is_empty() {
      info!(%table, "no data, skipping");
      return Ok(LoadReport::empty(table));
    }
    info!(%table, rows = records.len(), "populating table");

    for record in &mut records {
      for (from, to) in spec.header_renames {
        record.rename(from, to);
      }
    }

    let checks = self.key_checks(spec).await?;

    let mut report = LoadReport::empty(table);
    let mut accepted: Vec<Vec<rusqlite::types::Value>> = Vec::with_capacity(records.len());

    for record in &records {
      let row = convert_record(spec, record);

      if let Some(check) = first_violation(&row, &checks) {
        let value = row[check.index].clone();
        warn!(
          %table,
          column = check.column,
          parent = %check.parent,
          %value,
          "dropping row with unknown reference"
        );
        report.skipped_rows.push(SkippedRow {
          column: check.column,
          value,
          row: spec.column_names().zip(row).collect(),
        });
        continue;
      }

      let mut params = Vec::with_capacity(row.len() + 1);
      if let Some(lookup) = detachments {
        let id = lookup.resolve(
          record.get(DETACHMENT_FACTION_HEADER),
          record.get(DETACHMENT_NAME_HEADER),
        );
        params.push(encode_value(id.into()));
      }
      params.extend(row.into_iter().map(encode_value));
      accepted.push(params);
    }

    let mut columns: Vec<&str> = Vec::with_capacity(spec.columns.len() + 1);
    if detachments.is_some() {
      columns.push(DETACHMENT_ID_COLUMN);
    }
    columns.extend(spec.column_names());
    let sql = insert_or_replace_sql(table.name(), &columns);

    report.inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&sql)?;
          for params in &accepted {
            stmt.execute(rusqlite::params_from_iter(params.iter()))?;
          }
        }
        tx.commit()?;
        Ok(accepted.len())
      })
      .await?;
    report.skipped = report.skipped_rows.len();

    if report.skipped > 0 {
      warn!(
        %table,
        skipped = report.skipped,
        "skipped rows with invalid foreign keys; check the source data"
      );
    }
    info!(%table, inserted = report.inserted, "table loaded");
    Ok(report)
  }

  /// Pre-fetch every parent key set `spec` needs, once per parent table.
  async fn key_checks(&self, spec: &TableSpec) -> Result<Vec<KeyCheck>> {
    let mut fetched: HashMap<Table, Arc<HashSet<Value>>> = HashMap::new();
    let mut checks = Vec::with_capacity(spec.foreign_keys.len());

    for fk in spec.foreign_keys {
      let index = spec
        .columns
        .iter()
        .position(|c| c.name == fk.column)
        .ok_or_else(|| {
          muster_core::Error::InvalidCatalogue(format!(
            "{}.{} has no converter",
            spec.table, fk.column
          ))
        })?;

      let valid = match fetched.get(&fk.parent) {
        Some(set) => Arc::clone(set),
        None => {
          let set = Arc::new(self.valid_keys(fk.parent).await?);
          debug!(table = %spec.table, parent = %fk.parent, keys = set.len(), "pre-fetched parent keys");
          fetched.insert(fk.parent, Arc::clone(&set));
          set
        }
      };

      checks.push(KeyCheck { index, column: fk.column, parent: fk.parent, valid });
    }
    Ok(checks)
  }

  /// Every primary-key value currently stored in `parent`.
  pub async fn valid_keys(&self, parent: Table) -> Result<HashSet<Value>> {
    let id_column = parent
      .id_column()
      .ok_or(Error::Core(muster_core::Error::NoIdentifier(parent)))?;
    let sql = format!("SELECT {} FROM {}", quote_ident(id_column), quote_ident(parent.name()));

    let raw: Vec<rusqlite::types::Value> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raw.into_iter().map(decode_value).collect())
  }
}
