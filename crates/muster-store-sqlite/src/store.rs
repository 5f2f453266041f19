//! [`SqliteStore`]: connection handling, schema application and the read side
//! ([`DatasetStore`]).

use std::path::Path;

use chrono::{DateTime, Utc};
use muster_core::{
  model::{Faction, Row},
  store::DatasetStore,
  tables::Table,
};
use rusqlite::OptionalExtension as _;
use tracing::info;

use crate::{
  Error, Result,
  encode::{decode_dt, encode_dt, quote_ident, value_to_json},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The rules dataset backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the same connection, so pragmas persist between calls.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. Tables are not created until
  /// [`apply_schema`](Self::apply_schema) runs.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn })
  }

  /// Apply `ddl` verbatim with foreign-key enforcement turned off.
  ///
  /// Enforcement stays off until [`set_foreign_keys`](Self::set_foreign_keys)
  /// turns it back on once every table is loaded.
  pub async fn apply_schema(&self, ddl: impl Into<String>) -> Result<()> {
    let ddl = ddl.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    info!("database schema applied");
    Ok(())
  }

  pub async fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
    let pragma = if enabled { "PRAGMA foreign_keys = ON;" } else { "PRAGMA foreign_keys = OFF;" };
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(pragma)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn foreign_keys_enabled(&self) -> Result<bool> {
    let on: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
      .await?;
    Ok(on == 1)
  }

  /// Replace the stored marker with `marker`.
  pub async fn record_last_update(&self, marker: DateTime<Utc>) -> Result<()> {
    let at = encode_dt(marker);
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM last_update", [])?;
        tx.execute("INSERT INTO last_update (last_update) VALUES (?1)", rusqlite::params![at])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows in `table`.
  pub async fn count(&self, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table.name()));
    let n = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n)
  }

  /// Every row of `table` as JSON objects, ordered by rowid.
  pub async fn rows(&self, table: Table) -> Result<Vec<Row>> {
    let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table.name()));
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let rows = stmt
          .query_map([], |row| read_row(row, &names))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

fn read_row(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<Row> {
  let mut out = Row::new();
  for (i, name) in names.iter().enumerate() {
    let value: rusqlite::types::Value = row.get(i)?;
    out.insert(name.clone(), value_to_json(value));
  }
  Ok(out)
}

// ─── DatasetStore impl ───────────────────────────────────────────────────────

impl DatasetStore for SqliteStore {
  type Error = Error;

  async fn list_factions(&self) -> Result<Vec<Faction>> {
    let factions = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, link FROM factions ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Faction {
              id:   row.get(0)?,
              name: row.get(1)?,
              link: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(factions)
  }

  async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<Row>> {
    let id_column = table
      .id_column()
      .ok_or(Error::Core(muster_core::Error::NoIdentifier(table)))?;

    let key = if table.has_integer_id() {
      match id.trim().parse::<i64>() {
        Ok(i) => rusqlite::types::Value::Integer(i),
        Err(_) => return Ok(None),
      }
    } else {
      rusqlite::types::Value::Text(id.to_owned())
    };

    let sql = format!(
      "SELECT * FROM {} WHERE {} = ?1",
      quote_ident(table.name()),
      quote_ident(id_column)
    );

    let row = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        Ok(stmt.query_row([key], |row| read_row(row, &names)).optional()?)
      })
      .await?;
    Ok(row)
  }

  async fn last_update(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT last_update FROM last_update LIMIT 1", [], |r| r.get(0))
            .optional()?,
        )
      })
      .await?;
    raw.as_deref().map(decode_dt).transpose()
  }
}
