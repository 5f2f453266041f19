//! Dialect: `|`-delimited, header row, values trimmed, records terminated by
//! `\n` (a preceding `\r` is trimmed away with the rest of the whitespace, a
//! `\r` anywhere else stays part of the value).

use csv::{ReaderBuilder, Terminator, Trim};

use crate::{Record, Result};

pub const DELIMITER: u8 = b'|';

pub(crate) fn parse_str(input: &str) -> Result<Vec<Record>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);

  let mut reader = ReaderBuilder::new()
    .delimiter(DELIMITER)
    .has_headers(true)
    .flexible(true)
    .trim(Trim::All)
    .terminator(Terminator::Any(b'\n'))
    .from_reader(input.as_bytes());

  let headers = reader.headers()?.clone();
  let mut rows = Vec::new();

  for result in reader.records() {
    let record = result?;
    // Extra cells past the last header are dropped; missing trailing cells
    // simply never get inserted.
    let row: Record = headers
      .iter()
      .zip(record.iter())
      .filter(|(h, v)| !h.is_empty() && !v.is_empty())
      .collect();
    if !row.is_empty() {
      rows.push(row);
    }
  }

  Ok(rows)
}
