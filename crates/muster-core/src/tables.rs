//! The table catalogue: which CSV file feeds which table, how each column is
//! converted, which columns reference which parent table, and the order in
//! which tables must be loaded.
//!
//! Foreign keys are listed explicitly per table rather than inferred from
//! column names.

use std::{collections::HashSet, fmt, str::FromStr};

use crate::{Error, Result, convert::Convert};

// ─── Table names ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Factions,
  Sources,
  Detachments,
  Abilities,
  DetachmentsAbilities,
  Stratagems,
  Enhancements,
  Datasheets,
  DatasheetsModels,
  DatasheetsModelCosts,
  DatasheetsUnitCompositions,
  DatasheetsWargears,
  DatasheetsWargearOptions,
  DatasheetsAbilities,
  DatasheetsKeywords,
  DatasheetsLeaders,
  DatasheetsStratagems,
  DatasheetsEnhancements,
  DatasheetsDetachmentsAbilities,
  LastUpdate,
}

impl Table {
  pub const ALL: [Table; 20] = [
    Table::Factions,
    Table::Sources,
    Table::Detachments,
    Table::Abilities,
    Table::DetachmentsAbilities,
    Table::Stratagems,
    Table::Enhancements,
    Table::Datasheets,
    Table::DatasheetsModels,
    Table::DatasheetsModelCosts,
    Table::DatasheetsUnitCompositions,
    Table::DatasheetsWargears,
    Table::DatasheetsWargearOptions,
    Table::DatasheetsAbilities,
    Table::DatasheetsKeywords,
    Table::DatasheetsLeaders,
    Table::DatasheetsStratagems,
    Table::DatasheetsEnhancements,
    Table::DatasheetsDetachmentsAbilities,
    Table::LastUpdate,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Table::Factions => "factions",
      Table::Sources => "sources",
      Table::Detachments => "detachments",
      Table::Abilities => "abilities",
      Table::DetachmentsAbilities => "detachments_abilities",
      Table::Stratagems => "stratagems",
      Table::Enhancements => "enhancements",
      Table::Datasheets => "datasheets",
      Table::DatasheetsModels => "datasheets_models",
      Table::DatasheetsModelCosts => "datasheets_model_costs",
      Table::DatasheetsUnitCompositions => "datasheets_unit_compositions",
      Table::DatasheetsWargears => "datasheets_wargears",
      Table::DatasheetsWargearOptions => "datasheets_wargear_options",
      Table::DatasheetsAbilities => "datasheets_abilities",
      Table::DatasheetsKeywords => "datasheets_keywords",
      Table::DatasheetsLeaders => "datasheets_leaders",
      Table::DatasheetsStratagems => "datasheets_stratagems",
      Table::DatasheetsEnhancements => "datasheets_enhancements",
      Table::DatasheetsDetachmentsAbilities => "datasheets_detachments_abilities",
      Table::LastUpdate => "last_update",
    }
  }

  /// The single-column primary key, for tables that have one.
  pub fn id_column(self) -> Option<&'static str> {
    match self {
      Table::Factions
      | Table::Sources
      | Table::Detachments
      | Table::Abilities
      | Table::DetachmentsAbilities
      | Table::Stratagems
      | Table::Enhancements
      | Table::Datasheets => Some("id"),
      _ => None,
    }
  }

  /// Whether the `id` column is an integer (everything except factions,
  /// which are keyed by their external text code).
  pub fn has_integer_id(self) -> bool {
    self.id_column().is_some() && self != Table::Factions
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Table {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Table::ALL
      .into_iter()
      .find(|t| t.name() == s)
      .ok_or_else(|| Error::UnknownTable(s.to_owned()))
  }
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// Load stages, in the order the population run executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
  SchemaInit,
  Independent,
  UnitProfiles,
  DeriveDetachments,
  DetachmentScoped,
  CrossLinks,
  Done,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::SchemaInit => "schema-init",
      Stage::Independent => "load-independent-tables",
      Stage::UnitProfiles => "load-unit-profile-and-children",
      Stage::DeriveDetachments => "derive-detachments",
      Stage::DetachmentScoped => "load-detachment-scoped-tables",
      Stage::CrossLinks => "load-cross-link-tables",
      Stage::Done => "done",
    })
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub name:    &'static str,
  pub convert: Convert,
}

impl Column {
  const fn new(name: &'static str, convert: Convert) -> Self { Self { name, convert } }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
  pub column: &'static str,
  pub parent: Table,
}

impl ForeignKey {
  const fn new(column: &'static str, parent: Table) -> Self { Self { column, parent } }
}

/// Everything needed to load one table from its CSV file.
#[derive(Debug)]
pub struct TableSpec {
  pub table:              Table,
  pub source_file:        &'static str,
  pub stage:              Stage,
  /// Destination columns, in insert order.
  pub columns:            &'static [Column],
  /// `(csv header, column name)` pairs where the two differ.
  pub header_renames:     &'static [(&'static str, &'static str)],
  pub foreign_keys:       &'static [ForeignKey],
  /// Rows carry a `(faction_id, detachment)` pair resolved to `detachment_id`.
  pub detachment_scoped:  bool,
}

impl TableSpec {
  pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.columns.iter().map(|c| c.name)
  }
}

/// The CSV file holding the remote freshness marker.
pub const MARKER_FILE: &str = "Last_update.csv";

/// CSV columns every detachment-scoped source carries.
pub const DETACHMENT_FACTION_HEADER: &str = "faction_id";
pub const DETACHMENT_NAME_HEADER: &str = "detachment";

use Convert::{DashNull, Flag, Int, Text};

// ── Independent ──────────────────────────────────────────────────────────────

pub static FACTIONS: TableSpec = TableSpec {
  table:             Table::Factions,
  source_file:       "Factions.csv",
  stage:             Stage::Independent,
  columns:           &[
    Column::new("id", Text),
    Column::new("name", Text),
    Column::new("link", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[],
  detachment_scoped: false,
};

pub static SOURCES: TableSpec = TableSpec {
  table:             Table::Sources,
  source_file:       "Source.csv",
  stage:             Stage::Independent,
  columns:           &[
    Column::new("id", Int),
    Column::new("name", Text),
    Column::new("type", Text),
    Column::new("edition", Text),
    Column::new("version", Text),
    Column::new("errata_date", Text),
    Column::new("errata_link", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[],
  detachment_scoped: false,
};

pub static ABILITIES: TableSpec = TableSpec {
  table:             Table::Abilities,
  source_file:       "Abilities.csv",
  stage:             Stage::Independent,
  columns:           &[
    Column::new("id", Int),
    Column::new("faction_id", Text),
    Column::new("name", Text),
    Column::new("legend", Text),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[ForeignKey::new("faction_id", Table::Factions)],
  detachment_scoped: false,
};

// ── Unit profiles and their children ─────────────────────────────────────────

pub static DATASHEETS: TableSpec = TableSpec {
  table:             Table::Datasheets,
  source_file:       "Datasheets.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("id", Int),
    Column::new("name", Text),
    Column::new("faction_id", Text),
    Column::new("source_id", Int),
    Column::new("role", Text),
    Column::new("legend", Text),
    Column::new("loadout", Text),
    Column::new("transport", Text),
    Column::new("virtual", Flag),
    Column::new("leader_head", Text),
    Column::new("leader_footer", Text),
    Column::new("damaged_w", Text),
    Column::new("damaged_description", Text),
    Column::new("link", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[
    ForeignKey::new("faction_id", Table::Factions),
    ForeignKey::new("source_id", Table::Sources),
  ],
  detachment_scoped: false,
};

const DATASHEET_FK: &[ForeignKey] = &[ForeignKey::new("datasheet_id", Table::Datasheets)];

pub static DATASHEETS_MODELS: TableSpec = TableSpec {
  table:             Table::DatasheetsModels,
  source_file:       "Datasheets_models.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("name", Text),
    Column::new("M", Text),
    Column::new("T", Text),
    Column::new("Sv", Text),
    Column::new("inv_sv", DashNull),
    Column::new("inv_sv_descr", Text),
    Column::new("W", Text),
    Column::new("Ld", Text),
    Column::new("OC", Text),
    Column::new("base_size", Text),
    Column::new("base_size_descr", Text),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_MODEL_COSTS: TableSpec = TableSpec {
  table:             Table::DatasheetsModelCosts,
  source_file:       "Datasheets_models_cost.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("description", Text),
    Column::new("cost", Text),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_UNIT_COMPOSITIONS: TableSpec = TableSpec {
  table:             Table::DatasheetsUnitCompositions,
  source_file:       "Datasheets_unit_composition.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_WARGEARS: TableSpec = TableSpec {
  table:             Table::DatasheetsWargears,
  source_file:       "Datasheets_wargear.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("line_in_wargear", Int),
    Column::new("dice", Text),
    Column::new("name", Text),
    Column::new("description", Text),
    Column::new("range", Text),
    Column::new("type", Text),
    Column::new("A", Text),
    Column::new("BS_WS", Text),
    Column::new("S", Text),
    Column::new("AP", Text),
    Column::new("D", Text),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_WARGEAR_OPTIONS: TableSpec = TableSpec {
  table:             Table::DatasheetsWargearOptions,
  source_file:       "Datasheets_options.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("button", Text),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_ABILITIES: TableSpec = TableSpec {
  table:             Table::DatasheetsAbilities,
  source_file:       "Datasheets_abilities.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("line", Int),
    Column::new("ability_id", Int),
    Column::new("model", Text),
    Column::new("name", Text),
    Column::new("description", Text),
    Column::new("type", Text),
    Column::new("parameter", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[
    ForeignKey::new("datasheet_id", Table::Datasheets),
    ForeignKey::new("ability_id", Table::Abilities),
  ],
  detachment_scoped: false,
};

pub static DATASHEETS_KEYWORDS: TableSpec = TableSpec {
  table:             Table::DatasheetsKeywords,
  source_file:       "Datasheets_keywords.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("keyword", Text),
    Column::new("model", Text),
    Column::new("is_faction_keyword", Flag),
  ],
  header_renames:    &[],
  foreign_keys:      DATASHEET_FK,
  detachment_scoped: false,
};

pub static DATASHEETS_LEADERS: TableSpec = TableSpec {
  table:             Table::DatasheetsLeaders,
  source_file:       "Datasheets_leader.csv",
  stage:             Stage::UnitProfiles,
  columns:           &[
    Column::new("leader_datasheet_id", Int),
    Column::new("unit_datasheet_id", Int),
  ],
  header_renames:    &[
    ("leader_id", "leader_datasheet_id"),
    ("attached_id", "unit_datasheet_id"),
  ],
  foreign_keys:      &[
    ForeignKey::new("leader_datasheet_id", Table::Datasheets),
    ForeignKey::new("unit_datasheet_id", Table::Datasheets),
  ],
  detachment_scoped: false,
};

// ── Detachment-scoped ────────────────────────────────────────────────────────

pub static STRATAGEMS: TableSpec = TableSpec {
  table:             Table::Stratagems,
  source_file:       "Stratagems.csv",
  stage:             Stage::DetachmentScoped,
  columns:           &[
    Column::new("id", Int),
    Column::new("faction_id", Text),
    Column::new("name", Text),
    Column::new("type", Text),
    Column::new("cp_cost", Text),
    Column::new("legend", Text),
    Column::new("turn", Text),
    Column::new("phase", Text),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[],
  detachment_scoped: true,
};

pub static ENHANCEMENTS: TableSpec = TableSpec {
  table:             Table::Enhancements,
  source_file:       "Enhancements.csv",
  stage:             Stage::DetachmentScoped,
  columns:           &[
    Column::new("id", Int),
    Column::new("faction_id", Text),
    Column::new("name", Text),
    Column::new("cost", Text),
    Column::new("legend", Text),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[],
  detachment_scoped: true,
};

pub static DETACHMENTS_ABILITIES: TableSpec = TableSpec {
  table:             Table::DetachmentsAbilities,
  source_file:       "Detachment_abilities.csv",
  stage:             Stage::DetachmentScoped,
  columns:           &[
    Column::new("id", Int),
    Column::new("name", Text),
    Column::new("legend", Text),
    Column::new("description", Text),
  ],
  header_renames:    &[],
  foreign_keys:      &[],
  detachment_scoped: true,
};

// ── Cross links ──────────────────────────────────────────────────────────────

pub static DATASHEETS_STRATAGEMS: TableSpec = TableSpec {
  table:             Table::DatasheetsStratagems,
  source_file:       "Datasheets_stratagems.csv",
  stage:             Stage::CrossLinks,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("stratagem_id", Int),
  ],
  header_renames:    &[],
  foreign_keys:      &[
    ForeignKey::new("datasheet_id", Table::Datasheets),
    ForeignKey::new("stratagem_id", Table::Stratagems),
  ],
  detachment_scoped: false,
};

pub static DATASHEETS_ENHANCEMENTS: TableSpec = TableSpec {
  table:             Table::DatasheetsEnhancements,
  source_file:       "Datasheets_enhancements.csv",
  stage:             Stage::CrossLinks,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("enhancement_id", Int),
  ],
  header_renames:    &[],
  foreign_keys:      &[
    ForeignKey::new("datasheet_id", Table::Datasheets),
    ForeignKey::new("enhancement_id", Table::Enhancements),
  ],
  detachment_scoped: false,
};

pub static DATASHEETS_DETACHMENTS_ABILITIES: TableSpec = TableSpec {
  table:             Table::DatasheetsDetachmentsAbilities,
  source_file:       "Datasheets_detachment_abilities.csv",
  stage:             Stage::CrossLinks,
  columns:           &[
    Column::new("datasheet_id", Int),
    Column::new("detachment_ability_id", Int),
  ],
  header_renames:    &[],
  foreign_keys:      &[
    ForeignKey::new("datasheet_id", Table::Datasheets),
    ForeignKey::new("detachment_ability_id", Table::DetachmentsAbilities),
  ],
  detachment_scoped: false,
};

/// Every CSV-backed table, in load order.
pub static LOAD_ORDER: &[&TableSpec] = &[
  &FACTIONS,
  &SOURCES,
  &ABILITIES,
  &DATASHEETS,
  &DATASHEETS_MODELS,
  &DATASHEETS_MODEL_COSTS,
  &DATASHEETS_UNIT_COMPOSITIONS,
  &DATASHEETS_WARGEARS,
  &DATASHEETS_WARGEAR_OPTIONS,
  &DATASHEETS_ABILITIES,
  &DATASHEETS_KEYWORDS,
  &DATASHEETS_LEADERS,
  &STRATAGEMS,
  &ENHANCEMENTS,
  &DETACHMENTS_ABILITIES,
  &DATASHEETS_STRATAGEMS,
  &DATASHEETS_ENHANCEMENTS,
  &DATASHEETS_DETACHMENTS_ABILITIES,
];

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// The converter set for `table`, or [`Error::MissingConverters`].
pub fn spec_for(table: Table) -> Result<&'static TableSpec> {
  LOAD_ORDER
    .iter()
    .find(|s| s.table == table)
    .copied()
    .ok_or(Error::MissingConverters(table))
}

/// Tables loaded during `stage`, in order.
pub fn tables_in(stage: Stage) -> impl Iterator<Item = &'static TableSpec> {
  LOAD_ORDER.iter().copied().filter(move |s| s.stage == stage)
}

/// Every file the remote source must provide for a full population.
pub fn source_files() -> Vec<&'static str> {
  LOAD_ORDER.iter().map(|s| s.source_file).collect()
}

/// Structural checks run once before any loading starts.
///
/// - stages are non-decreasing along [`LOAD_ORDER`];
/// - every table has at least one column and appears once;
/// - every FK column is a declared column;
/// - every FK parent is loaded earlier, or is `detachments` and the child
///   loads after derivation.
pub fn validate_catalogue() -> Result<()> {
  let mut loaded: HashSet<Table> = HashSet::new();
  let mut last_stage = Stage::SchemaInit;

  for spec in LOAD_ORDER {
    let table = spec.table;
    if spec.columns.is_empty() {
      return Err(Error::MissingConverters(table));
    }
    if spec.stage < last_stage {
      return Err(Error::InvalidCatalogue(format!(
        "{table} is in stage {} but follows a table in stage {last_stage}",
        spec.stage
      )));
    }
    last_stage = spec.stage;

    for fk in spec.foreign_keys {
      if !spec.column_names().any(|c| c == fk.column) {
        return Err(Error::InvalidCatalogue(format!(
          "{table}.{} is a foreign key but has no converter",
          fk.column
        )));
      }
      let parent_ready = loaded.contains(&fk.parent)
        || (fk.parent == Table::Detachments && spec.stage > Stage::DeriveDetachments);
      if !parent_ready {
        return Err(Error::InvalidCatalogue(format!(
          "{table}.{} references {} which is not loaded before it",
          fk.column, fk.parent
        )));
      }
    }
    if spec.detachment_scoped && !spec.foreign_keys.is_empty() {
      return Err(Error::InvalidCatalogue(format!(
        "{table} is detachment-scoped and must not filter on foreign keys"
      )));
    }
    if spec.detachment_scoped && spec.stage <= Stage::DeriveDetachments {
      return Err(Error::InvalidCatalogue(format!(
        "{table} is detachment-scoped but loads before detachments are derived"
      )));
    }

    if !loaded.insert(table) {
      return Err(Error::InvalidCatalogue(format!("{table} is listed twice")));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalogue_is_valid() {
    validate_catalogue().unwrap();
  }

  #[test]
  fn eighteen_source_files() {
    let files = source_files();
    assert_eq!(files.len(), 18);
    assert!(!files.contains(&MARKER_FILE));
  }

  #[test]
  fn table_names_round_trip() {
    for t in Table::ALL {
      assert_eq!(t.name().parse::<Table>().unwrap(), t);
    }
    assert!("nope".parse::<Table>().is_err());
  }

  #[test]
  fn derived_tables_have_no_converters() {
    assert!(matches!(
      spec_for(Table::Detachments),
      Err(Error::MissingConverters(Table::Detachments))
    ));
    assert!(spec_for(Table::LastUpdate).is_err());
    assert_eq!(spec_for(Table::Datasheets).unwrap().source_file, "Datasheets.csv");
  }

  #[test]
  fn detachment_scoped_rows_are_never_key_filtered() {
    let scoped: Vec<_> = LOAD_ORDER.iter().filter(|s| s.detachment_scoped).collect();
    assert_eq!(scoped.len(), 3);
    for spec in scoped {
      assert!(spec.foreign_keys.is_empty(), "{} filters on a foreign key", spec.table);
    }
  }

  #[test]
  fn leader_headers_are_renamed() {
    let spec = spec_for(Table::DatasheetsLeaders).unwrap();
    assert!(spec.header_renames.contains(&("leader_id", "leader_datasheet_id")));
    assert!(spec.header_renames.contains(&("attached_id", "unit_datasheet_id")));
  }

  #[test]
  fn stages_are_contiguous() {
    let stages: Vec<Stage> = LOAD_ORDER.iter().map(|s| s.stage).collect();
    let mut sorted = stages.clone();
    sorted.sort();
    assert_eq!(stages, sorted);
    assert_eq!(tables_in(Stage::DetachmentScoped).count(), 3);
    assert!(tables_in(Stage::DetachmentScoped).all(|s| s.detachment_scoped));
  }
}
