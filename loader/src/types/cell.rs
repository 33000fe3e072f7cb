use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::conversions::numeric::PgNumeric;

/// Date format used when a [`Cell`] is rendered as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time format used when a [`Cell`] is rendered as text.
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";
/// Timestamp format used when a [`Cell`] is rendered as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Zoned timestamp format used when a [`Cell`] is rendered as text.
pub const TIMESTAMPTZ_FORMAT_HH_MM: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// A single value read from an artifact or produced by coercion.
///
/// [`Cell::Null`] is the explicit missing marker, distinct from a column that is not present.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I16(i16),
    I32(i32),
    I64(i64),
    U32(u32),
    F32(f32),
    F64(f64),
    Numeric(PgNumeric),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns `true` for the missing sentinels that should be treated as null.
    ///
    /// Floating point `NaN` and numeric `NaN` are sentinels; infinities are real values.
    pub fn is_missing_sentinel(&self) -> bool {
        match self {
            Cell::F32(value) => value.is_nan(),
            Cell::F64(value) => value.is_nan(),
            Cell::Numeric(PgNumeric::NaN) => true,
            _ => false,
        }
    }

    /// Renders the cell as text, or `None` for [`Cell::Null`].
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Cell::Null => return None,
            Cell::Bool(value) => value.to_string(),
            Cell::String(value) => value.clone(),
            Cell::I16(value) => value.to_string(),
            Cell::I32(value) => value.to_string(),
            Cell::I64(value) => value.to_string(),
            Cell::U32(value) => value.to_string(),
            Cell::F32(value) => value.to_string(),
            Cell::F64(value) => value.to_string(),
            Cell::Numeric(value) => value.to_string(),
            Cell::Date(value) => value.format(DATE_FORMAT).to_string(),
            Cell::Time(value) => value.format(TIME_FORMAT).to_string(),
            Cell::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
            Cell::TimestampTz(value) => value.format(TIMESTAMPTZ_FORMAT_HH_MM).to_string(),
            Cell::Uuid(value) => value.hyphenated().to_string(),
            // A JSON string is rendered without its quotes.
            Cell::Json(serde_json::Value::String(value)) => value.clone(),
            Cell::Json(value) => value.to_string(),
            Cell::Bytes(value) => {
                let mut hex = String::with_capacity(2 + value.len() * 2);
                hex.push_str("\\x");
                for byte in value {
                    hex.push_str(&format!("{byte:02x}"));
                }
                hex
            }
        };

        Some(text)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::F64(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}
