//! Default DDL for the Muster SQLite store.
//!
//! Applied verbatim at the start of every population run, with foreign-key
//! enforcement off. Every table is dropped and recreated: rows never survive
//! from one run to the next. A deployment may supply its own DDL instead; it
//! must define the same tables and columns.

/// Full schema DDL.
pub const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

DROP TABLE IF EXISTS datasheets_detachments_abilities;
DROP TABLE IF EXISTS datasheets_enhancements;
DROP TABLE IF EXISTS datasheets_stratagems;
DROP TABLE IF EXISTS datasheets_leaders;
DROP TABLE IF EXISTS datasheets_keywords;
DROP TABLE IF EXISTS datasheets_abilities;
DROP TABLE IF EXISTS datasheets_wargear_options;
DROP TABLE IF EXISTS datasheets_wargears;
DROP TABLE IF EXISTS datasheets_unit_compositions;
DROP TABLE IF EXISTS datasheets_model_costs;
DROP TABLE IF EXISTS datasheets_models;
DROP TABLE IF EXISTS datasheets;
DROP TABLE IF EXISTS detachments_abilities;
DROP TABLE IF EXISTS enhancements;
DROP TABLE IF EXISTS stratagems;
DROP TABLE IF EXISTS detachments;
DROP TABLE IF EXISTS abilities;
DROP TABLE IF EXISTS sources;
DROP TABLE IF EXISTS factions;
DROP TABLE IF EXISTS last_update;

CREATE TABLE factions (
    id   TEXT PRIMARY KEY,
    name TEXT,
    link TEXT
);

CREATE TABLE sources (
    id          INTEGER PRIMARY KEY,
    name        TEXT,
    type        TEXT,
    edition     TEXT,
    version     TEXT,
    errata_date TEXT,
    errata_link TEXT
);

CREATE TABLE abilities (
    id          INTEGER PRIMARY KEY,
    faction_id  TEXT REFERENCES factions(id),
    name        TEXT,
    legend      TEXT,
    description TEXT
);

-- Derived from (faction_id, detachment) pairs; no source file of its own.
CREATE TABLE detachments (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    faction_id TEXT NOT NULL REFERENCES factions(id),
    name       TEXT NOT NULL,
    UNIQUE (faction_id, name)
);

CREATE TABLE stratagems (
    id            INTEGER PRIMARY KEY,
    detachment_id INTEGER REFERENCES detachments(id),
    faction_id    TEXT REFERENCES factions(id),
    name          TEXT,
    type          TEXT,
    cp_cost       TEXT,
    legend        TEXT,
    turn          TEXT,
    phase         TEXT,
    description   TEXT
);

CREATE TABLE enhancements (
    id            INTEGER PRIMARY KEY,
    detachment_id INTEGER REFERENCES detachments(id),
    faction_id    TEXT REFERENCES factions(id),
    name          TEXT,
    cost          TEXT,
    legend        TEXT,
    description   TEXT
);

CREATE TABLE detachments_abilities (
    id            INTEGER PRIMARY KEY,
    detachment_id INTEGER REFERENCES detachments(id),
    name          TEXT,
    legend        TEXT,
    description   TEXT
);

CREATE TABLE datasheets (
    id                  INTEGER PRIMARY KEY,
    name                TEXT,
    faction_id          TEXT REFERENCES factions(id),
    source_id           INTEGER REFERENCES sources(id),
    role                TEXT,
    legend              TEXT,
    loadout             TEXT,
    transport           TEXT,
    virtual             INTEGER NOT NULL DEFAULT 0,
    leader_head         TEXT,
    leader_footer       TEXT,
    damaged_w           TEXT,
    damaged_description TEXT,
    link                TEXT
);

CREATE TABLE datasheets_models (
    datasheet_id    INTEGER REFERENCES datasheets(id),
    line            INTEGER,
    name            TEXT,
    M               TEXT,
    T               TEXT,
    Sv              TEXT,
    inv_sv          TEXT,
    inv_sv_descr    TEXT,
    W               TEXT,
    Ld              TEXT,
    OC              TEXT,
    base_size       TEXT,
    base_size_descr TEXT,
    PRIMARY KEY (datasheet_id, line)
);

CREATE TABLE datasheets_model_costs (
    datasheet_id INTEGER REFERENCES datasheets(id),
    line         INTEGER,
    description  TEXT,
    cost         TEXT,
    PRIMARY KEY (datasheet_id, line)
);

CREATE TABLE datasheets_unit_compositions (
    datasheet_id INTEGER REFERENCES datasheets(id),
    line         INTEGER,
    description  TEXT,
    PRIMARY KEY (datasheet_id, line)
);

CREATE TABLE datasheets_wargears (
    datasheet_id    INTEGER REFERENCES datasheets(id),
    line            INTEGER,
    line_in_wargear INTEGER,
    dice            TEXT,
    name            TEXT,
    description     TEXT,
    "range"         TEXT,
    type            TEXT,
    A               TEXT,
    BS_WS           TEXT,
    S               TEXT,
    AP              TEXT,
    D               TEXT,
    PRIMARY KEY (datasheet_id, line, line_in_wargear)
);

CREATE TABLE datasheets_wargear_options (
    datasheet_id INTEGER REFERENCES datasheets(id),
    line         INTEGER,
    button       TEXT,
    description  TEXT,
    PRIMARY KEY (datasheet_id, line)
);

-- A unit may reference the same ability several times with different
-- parameters, hence `line` in the key.
CREATE TABLE datasheets_abilities (
    datasheet_id INTEGER REFERENCES datasheets(id),
    line         INTEGER,
    ability_id   INTEGER REFERENCES abilities(id),
    model        TEXT,
    name         TEXT,
    description  TEXT,
    type         TEXT,
    parameter    TEXT,
    PRIMARY KEY (datasheet_id, line)
);

CREATE TABLE datasheets_keywords (
    datasheet_id       INTEGER REFERENCES datasheets(id),
    keyword            TEXT,
    model              TEXT,
    is_faction_keyword INTEGER,
    PRIMARY KEY (datasheet_id, keyword)
);

CREATE TABLE datasheets_leaders (
    leader_datasheet_id INTEGER REFERENCES datasheets(id),
    unit_datasheet_id   INTEGER REFERENCES datasheets(id),
    PRIMARY KEY (leader_datasheet_id, unit_datasheet_id)
);

CREATE TABLE datasheets_stratagems (
    datasheet_id INTEGER REFERENCES datasheets(id),
    stratagem_id INTEGER REFERENCES stratagems(id),
    PRIMARY KEY (datasheet_id, stratagem_id)
);

CREATE TABLE datasheets_enhancements (
    datasheet_id   INTEGER REFERENCES datasheets(id),
    enhancement_id INTEGER REFERENCES enhancements(id),
    PRIMARY KEY (datasheet_id, enhancement_id)
);

CREATE TABLE datasheets_detachments_abilities (
    datasheet_id          INTEGER REFERENCES datasheets(id),
    detachment_ability_id INTEGER REFERENCES detachments_abilities(id),
    PRIMARY KEY (datasheet_id, detachment_ability_id)
);

CREATE TABLE last_update (
    last_update TEXT NOT NULL
);

CREATE INDEX datasheets_faction_idx ON datasheets(faction_id);
CREATE INDEX stratagems_detachment_idx ON stratagems(detachment_id);
CREATE INDEX enhancements_detachment_idx ON enhancements(detachment_id);
"#;
