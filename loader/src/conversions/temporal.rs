use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

const ZONED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %#z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
];

/// A parsed date-time that may or may not carry a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDateTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ParsedDateTime {
    /// Normalizes to UTC. Values without an offset are taken as UTC.
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            ParsedDateTime::Zoned(value) => value.with_timezone(&Utc),
            ParsedDateTime::Naive(value) => value.and_utc(),
        }
    }

    /// Returns the local wall clock reading, dropping any offset.
    pub fn wall_clock(self) -> NaiveDateTime {
        match self {
            ParsedDateTime::Zoned(value) => value.naive_local(),
            ParsedDateTime::Naive(value) => value,
        }
    }
}

/// Parses a date-time in ISO 8601 / RFC 3339 form or one of the common variants. A bare date
/// parses as midnight.
pub fn parse_datetime(s: &str) -> EtlResult<ParsedDateTime> {
    let s = s.trim();

    if let Ok(value) = DateTime::parse_from_rfc3339(s) {
        return Ok(ParsedDateTime::Zoned(value));
    }
    for format in ZONED_DATETIME_FORMATS {
        if let Ok(value) = DateTime::parse_from_str(s, format) {
            return Ok(ParsedDateTime::Zoned(value));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ParsedDateTime::Naive(value));
        }
    }
    if let Some(date) = parse_date_only(s) {
        return Ok(ParsedDateTime::Naive(date.and_time(NaiveTime::MIN)));
    }

    bail!(
        ErrorKind::ConversionError,
        "Invalid timestamp value",
        format!("Could not parse '{s}' as a timestamp")
    );
}

/// Parses a calendar date. Date-times are accepted and truncated to their (local) date.
pub fn parse_date(s: &str) -> EtlResult<NaiveDate> {
    let s = s.trim();

    if let Some(date) = parse_date_only(s) {
        return Ok(date);
    }
    match parse_datetime(s) {
        Ok(value) => Ok(value.wall_clock().date()),
        Err(_) => bail!(
            ErrorKind::ConversionError,
            "Invalid date value",
            format!("Could not parse '{s}' as a date")
        ),
    }
}

/// Parses a time of day. Date-times are accepted and reduced to their (local) time.
pub fn parse_time(s: &str) -> EtlResult<NaiveTime> {
    let s = s.trim();

    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(s, format) {
            return Ok(time);
        }
    }
    match parse_datetime(s) {
        Ok(value) => Ok(value.wall_clock().time()),
        Err(_) => bail!(
            ErrorKind::ConversionError,
            "Invalid time value",
            format!("Could not parse '{s}' as a time")
        ),
    }
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}
