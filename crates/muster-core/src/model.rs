//! Row types returned by the read side of the store.

use serde::{Deserialize, Serialize};

/// A faction, keyed by its stable external code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
  pub id:   String,
  pub name: Option<String>,
  pub link: Option<String>,
}

/// A single row of any table, as column name → JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;
