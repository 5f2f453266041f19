//! Converter registry: per-column coercion of raw CSV text into [`Value`]s.
//!
//! Every persisted column of every CSV-backed table names exactly one
//! [`Convert`] in its [`TableSpec`](crate::tables::TableSpec). Converters
//! never fail; unparseable input becomes `Null`.

use crate::value::Value;

/// How a raw CSV cell is coerced before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convert {
  /// Integer, or `Null` on empty/unparseable input.
  Int,
  /// Free text; empty becomes `Null`.
  Text,
  /// `"true"` in any casing is `1`; anything else, including `Null`, is `0`.
  Flag,
  /// Free text where a lone `"-"` means "no value".
  DashNull,
}

impl Convert {
  pub fn apply(self, raw: Option<&str>) -> Value {
    match self {
      Convert::Int => raw.and_then(parse_int).map_or(Value::Null, Value::Integer),
      Convert::Text => text(raw),
      Convert::Flag => Value::Integer(to_flag(raw)),
      Convert::DashNull => match raw.map(str::trim) {
        Some("-") => Value::Null,
        other => text(other),
      },
    }
  }
}

fn text(raw: Option<&str>) -> Value {
  match raw {
    Some(s) if !s.is_empty() => Value::Text(s.to_owned()),
    _ => Value::Null,
  }
}

/// Parse an integer, accepting integral decimal text such as `"3.0"`.
pub fn parse_int(raw: &str) -> Option<i64> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(i) = s.parse::<i64>() {
    return Some(i);
  }
  s.parse::<f64>()
    .ok()
    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
    .map(|f| f as i64)
}

pub fn to_flag(raw: Option<&str>) -> i64 {
  match raw {
    Some(s) if s.trim().eq_ignore_ascii_case("true") => 1,
    _ => 0,
  }
}
