//! Detachment derivation.
//!
//! Detachments have no source file. They are reconstructed from the distinct
//! `(faction_id, detachment)` pairs named by stratagems, enhancements and
//! detachment abilities, inserted to obtain surrogate ids, and handed back as
//! a [`DetachmentLookup`] for the detachment-scoped loads.

use std::collections::{BTreeSet, HashMap};

use muster_core::tables::{DETACHMENT_FACTION_HEADER, DETACHMENT_NAME_HEADER};
use muster_csv::Record;
use tracing::info;

use crate::{Result, SqliteStore};

/// `(faction code, detachment name)`
pub type DetachmentKey = (String, String);

/// In-memory map from `(faction code, detachment name)` to surrogate id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetachmentLookup {
  ids: HashMap<DetachmentKey, i64>,
}

impl DetachmentLookup {
  /// The surrogate id for a row's text pair; `None` if either half is
  /// missing or the pair was never derived.
  pub fn resolve(&self, faction: Option<&str>, name: Option<&str>) -> Option<i64> {
    let (faction, name) = (faction?, name?);
    self.ids.get(&(faction.to_owned(), name.to_owned())).copied()
  }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }

  /// All derived pairs, sorted.
  pub fn keys(&self) -> BTreeSet<DetachmentKey> { self.ids.keys().cloned().collect() }
}

impl FromIterator<(DetachmentKey, i64)> for DetachmentLookup {
  fn from_iter<I: IntoIterator<Item = (DetachmentKey, i64)>>(iter: I) -> Self {
    Self { ids: iter.into_iter().collect() }
  }
}

/// The distinct `(faction_id, detachment)` pairs across all `sources`.
///
/// Rows missing either half contribute nothing. The result does not depend
/// on row order or on duplicates.
pub fn collect_pairs<'a>(sources: impl IntoIterator<Item = &'a [Record]>) -> BTreeSet<DetachmentKey> {
  sources
    .into_iter()
    .flatten()
    .filter_map(|row| {
      let faction = row.get(DETACHMENT_FACTION_HEADER)?;
      let name = row.get(DETACHMENT_NAME_HEADER)?;
      Some((faction.to_owned(), name.to_owned()))
    })
    .collect()
}

impl SqliteStore {
  /// Derive and insert detachments from the three detachment-bearing
  /// sources, then read back the surrogate ids.
  ///
  /// Every pair is inserted, whether or not its faction is loaded, so each
  /// referencing row resolves to exactly one detachment. Foreign keys are
  /// off during a load. An empty pair set inserts nothing and yields an
  /// empty lookup, so every downstream `detachment_id` is `NULL`.
  pub async fn derive_detachments(&self, sources: &[&[Record]]) -> Result<DetachmentLookup> {
    info!("populating derived table: detachments");
    let pairs = collect_pairs(sources.iter().copied());
    if pairs.is_empty() {
      info!("no detachments referenced by any source");
      return Ok(DetachmentLookup::default());
    }

    let inserted = pairs.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO detachments (faction_id, name) VALUES (?1, ?2)")?;
          for (faction, name) in &pairs {
            stmt.execute(rusqlite::params![faction, name])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    info!(inserted, "inserted rows into detachments");

    let lookup = self.detachment_lookup().await?;
    info!(entries = lookup.len(), "created detachment lookup");
    Ok(lookup)
  }

  /// Build the lookup from whatever `detachments` currently holds.
  pub async fn detachment_lookup(&self) -> Result<DetachmentLookup> {
    let rows: Vec<(i64, String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, faction_id, name FROM detachments")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows.into_iter().map(|(id, faction, name)| ((faction, name), id)).collect())
  }
}
