//! Conversions between [`muster_core::Value`], SQLite's dynamic values and
//! JSON, plus the SQL text built from table descriptors.
//!
//! Timestamps are stored as RFC 3339 strings. Identifiers are always
//! double-quoted since some column names (`range`, `type`) are SQL keywords.

use chrono::{DateTime, SecondsFormat, Utc};
use muster_core::Value;
use rusqlite::types::Value as SqlValue;

use crate::{Error, Result};

// ─── Value ───────────────────────────────────────────────────────────────────

pub fn encode_value(v: Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(i),
    Value::Text(s) => SqlValue::Text(s),
  }
}

pub fn decode_value(v: SqlValue) -> Value {
  match v {
    SqlValue::Null | SqlValue::Blob(_) => Value::Null,
    SqlValue::Integer(i) => Value::Integer(i),
    SqlValue::Real(f) if f.fract() == 0.0 => Value::Integer(f as i64),
    SqlValue::Real(f) => Value::Text(f.to_string()),
    SqlValue::Text(s) => Value::Text(s),
  }
}

pub fn value_to_json(v: SqlValue) -> serde_json::Value {
  match v {
    SqlValue::Null | SqlValue::Blob(_) => serde_json::Value::Null,
    SqlValue::Integer(i) => i.into(),
    SqlValue::Real(f) => serde_json::Number::from_f64(f)
      .map_or(serde_json::Value::Null, serde_json::Value::Number),
    SqlValue::Text(s) => s.into(),
  }
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── SQL text ────────────────────────────────────────────────────────────────

pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

/// `INSERT OR REPLACE INTO "t" ("a", "b") VALUES (?1, ?2)`
pub fn insert_or_replace_sql(table: &str, columns: &[&str]) -> String {
  let cols = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
  let placeholders = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
  format!("INSERT OR REPLACE INTO {} ({cols}) VALUES ({placeholders})", quote_ident(table))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_sql_quotes_everything() {
    assert_eq!(
      insert_or_replace_sql("datasheets_wargears", &["datasheet_id", "range"]),
      r#"INSERT OR REPLACE INTO "datasheets_wargears" ("datasheet_id", "range") VALUES (?1, ?2)"#
    );
  }

  #[test]
  fn dt_round_trips_in_utc() {
    let dt = decode_dt("2024-05-01T00:00:00Z").unwrap();
    assert_eq!(encode_dt(dt), "2024-05-01T00:00:00Z");
  }
}
