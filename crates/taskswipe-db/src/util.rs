//! Row-decoding helpers shared by the query modules.

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

/// Server-assigned timestamp. Fixed-width RFC 3339 with microseconds, so
/// lexical order in SQLite equals chronological order.
pub(crate) fn now_ts() -> String {
    format_ts(Utc::now())
}

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str, row_id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

pub(crate) fn parse_opt_ts(raw: Option<&str>, row_id: &str) -> Option<DateTime<Utc>> {
    raw.map(|r| parse_ts(r, row_id))
}

pub(crate) fn parse_id(raw: &str, column: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", column, raw, row_id, e);
        Uuid::default()
    })
}

pub(crate) fn parse_enum<T>(raw: &str, fallback: T, row_id: &str) -> T
where
    T: FromStr<Err = taskswipe_types::ParseEnumError>,
{
    raw.parse().unwrap_or_else(|e| {
        warn!("{} on row '{}'", e, row_id);
        fallback
    })
}

pub(crate) fn parse_string_list(raw: &str, row_id: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt JSON list on row '{}': {}", row_id, e);
        Vec::new()
    })
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// True when the error is a UNIQUE / PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}
