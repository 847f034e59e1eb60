//! Raw scan result rows and the field coercions applied to them.

use std::collections::HashMap;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Stand-in stored for an integer column that was left empty.
pub const MISSING_INTEGER: i64 = -1;

/// Layout of certificate timestamps in scan output (always UTC).
pub const SCAN_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' has non-integer value '{value}'")]
    InvalidInteger { column: String, value: String },

    #[error("column '{column}' has malformed timestamp '{value}' (expected YYYY-MM-DDTHH:MM:SS)")]
    InvalidTimestamp { column: String, value: String },
}

/// Convert a scan flag to a tri-state boolean.
///
/// Only the literal strings `True` and `False` carry a value; anything else,
/// including the empty string, means "unknown".
pub fn coerce_flag(raw: &str) -> Option<bool> {
    match raw {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Convert an integer column. Empty means "not applicable" and maps to
/// [`MISSING_INTEGER`]; anything else must parse.
pub fn coerce_integer(column: &str, raw: &str) -> Result<i64, FieldError> {
    if raw.is_empty() {
        return Ok(MISSING_INTEGER);
    }
    raw.trim().parse::<i64>().map_err(|_| FieldError::InvalidInteger {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Parse a certificate timestamp column. Empty maps to `None`.
pub fn coerce_timestamp(column: &str, raw: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(raw.trim(), SCAN_TIMESTAMP_FORMAT)
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .map_err(|_| FieldError::InvalidTimestamp {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// One row of a scan results CSV, keyed by header name.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Set or replace a column value.
    pub fn set(&mut self, column: &str, value: &str) {
        self.fields.insert(column.to_string(), value.to_string());
    }

    pub fn text(&self, column: &str) -> Result<&str, FieldError> {
        self.fields
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| FieldError::MissingColumn {
                column: column.to_string(),
            })
    }

    pub fn flag(&self, column: &str) -> Result<Option<bool>, FieldError> {
        self.text(column).map(coerce_flag)
    }

    pub fn integer(&self, column: &str) -> Result<i64, FieldError> {
        coerce_integer(column, self.text(column)?)
    }

    pub fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
        coerce_timestamp(column, self.text(column)?)
    }

    /// Text with every `;` removed.
    pub fn text_without_semicolons(&self, column: &str) -> Result<String, FieldError> {
        Ok(self.text(column)?.replace(';', ""))
    }

    /// Best-effort row label for error messages.
    pub fn label(&self) -> &str {
        self.fields.get("Domain").map(String::as_str).unwrap_or("<no domain>")
    }
}
