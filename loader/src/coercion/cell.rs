use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use postgres::schema::LogicalType;

use crate::conversions::bool::parse_bool;
use crate::conversions::numeric::PgNumeric;
use crate::conversions::temporal::{parse_date, parse_datetime, parse_time};
use crate::types::Cell;

/// Why a cell could not be converted to its column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionFailure {
    /// The value could not be parsed as the column type.
    Invalid,
    /// The value is numeric but has a fractional part, for an integer column.
    NonIntegral,
}

/// Converts one cell to the representation required by `logical_type`.
///
/// Null is always accepted. Failures are reported so the caller can replace the cell with null
/// and count it.
pub fn coerce_cell(cell: Cell, logical_type: LogicalType) -> Result<Cell, CoercionFailure> {
    if cell.is_null() {
        return Ok(Cell::Null);
    }

    match logical_type {
        LogicalType::Text => Ok(coerce_text(cell)),
        LogicalType::Integer => coerce_integer(cell),
        LogicalType::Decimal => coerce_decimal(cell),
        LogicalType::Boolean => coerce_boolean(cell),
        LogicalType::Date => coerce_date(cell),
        LogicalType::Time => coerce_time(cell),
        LogicalType::TimestampTz => coerce_timestamptz(cell),
        LogicalType::Timestamp => coerce_timestamp(cell),
        LogicalType::Uuid => Ok(coerce_text(cell)),
        LogicalType::Unrecognized => Ok(cell),
    }
}

fn coerce_text(cell: Cell) -> Cell {
    match cell {
        Cell::String(_) => cell,
        Cell::Uuid(value) => Cell::String(value.hyphenated().to_string()),
        other => other.to_text().map_or(Cell::Null, Cell::String),
    }
}

/// Digits of `i64::MAX`. Anything longer before the decimal point cannot fit.
const I64_MAX_DIGITS: i64 = 19;

fn integral_numeric(value: &PgNumeric) -> Result<Cell, CoercionFailure> {
    // Checked first: `to_i64` rescales, which is unbounded for huge exponents.
    if !value.fits_numeric_range() || value.integer_digits().is_some_and(|d| d > I64_MAX_DIGITS) {
        return Err(CoercionFailure::Invalid);
    }

    match value {
        PgNumeric::Value(decimal) if decimal.is_integer() => decimal
            .to_i64()
            .map(Cell::I64)
            .ok_or(CoercionFailure::Invalid),
        PgNumeric::Value(_) | PgNumeric::PositiveInf | PgNumeric::NegativeInf => {
            Err(CoercionFailure::NonIntegral)
        }
        PgNumeric::NaN => Err(CoercionFailure::Invalid),
    }
}

fn integral_float(value: f64) -> Result<Cell, CoercionFailure> {
    if value.is_nan() {
        Err(CoercionFailure::Invalid)
    } else if !value.is_finite() || value.fract() != 0.0 {
        Err(CoercionFailure::NonIntegral)
    } else if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        Err(CoercionFailure::Invalid)
    } else {
        Ok(Cell::I64(value as i64))
    }
}

fn coerce_integer(cell: Cell) -> Result<Cell, CoercionFailure> {
    match cell {
        Cell::Bool(value) => Ok(Cell::I64(i64::from(value))),
        Cell::I16(value) => Ok(Cell::I64(i64::from(value))),
        Cell::I32(value) => Ok(Cell::I64(i64::from(value))),
        Cell::I64(_) => Ok(cell),
        Cell::U32(value) => Ok(Cell::I64(i64::from(value))),
        Cell::F32(value) => integral_float(f64::from(value)),
        Cell::F64(value) => integral_float(value),
        Cell::Numeric(value) => integral_numeric(&value),
        Cell::String(value) => {
            let value = value.trim();
            if let Ok(parsed) = value.parse::<i64>() {
                return Ok(Cell::I64(parsed));
            }
            match PgNumeric::from_str(value) {
                Ok(numeric) => integral_numeric(&numeric),
                Err(_) => Err(CoercionFailure::Invalid),
            }
        }
        _ => Err(CoercionFailure::Invalid),
    }
}

fn coerce_decimal(cell: Cell) -> Result<Cell, CoercionFailure> {
    let numeric = match cell {
        Cell::Numeric(value) => value,
        Cell::I16(value) => PgNumeric::from(i64::from(value)),
        Cell::I32(value) => PgNumeric::from(i64::from(value)),
        Cell::I64(value) => PgNumeric::from(value),
        Cell::U32(value) => PgNumeric::from(i64::from(value)),
        Cell::F32(value) => PgNumeric::from_f64(f64::from(value)).ok_or(CoercionFailure::Invalid)?,
        Cell::F64(value) => PgNumeric::from_f64(value).ok_or(CoercionFailure::Invalid)?,
        Cell::String(value) => PgNumeric::from_str(&value).map_err(|_| CoercionFailure::Invalid)?,
        _ => return Err(CoercionFailure::Invalid),
    };

    // A parsed `NaN` is a missing value, not a number.
    if numeric.is_nan() || !numeric.fits_numeric_range() {
        return Err(CoercionFailure::Invalid);
    }

    Ok(Cell::Numeric(numeric))
}

fn coerce_boolean(cell: Cell) -> Result<Cell, CoercionFailure> {
    let value = match cell {
        Cell::Bool(value) => value,
        Cell::I16(value) => integer_flag(i64::from(value))?,
        Cell::I32(value) => integer_flag(i64::from(value))?,
        Cell::I64(value) => integer_flag(value)?,
        Cell::U32(value) => integer_flag(i64::from(value))?,
        Cell::F32(value) => float_flag(f64::from(value))?,
        Cell::F64(value) => float_flag(value)?,
        Cell::Numeric(PgNumeric::Value(value)) => {
            if value == BigDecimal::from(1) {
                true
            } else if value == BigDecimal::from(0) {
                false
            } else {
                return Err(CoercionFailure::Invalid);
            }
        }
        Cell::String(value) => parse_bool(&value).map_err(|_| CoercionFailure::Invalid)?,
        _ => return Err(CoercionFailure::Invalid),
    };

    Ok(Cell::Bool(value))
}

fn integer_flag(value: i64) -> Result<bool, CoercionFailure> {
    match value {
        1 => Ok(true),
        0 => Ok(false),
        _ => Err(CoercionFailure::Invalid),
    }
}

fn float_flag(value: f64) -> Result<bool, CoercionFailure> {
    if value == 1.0 {
        Ok(true)
    } else if value == 0.0 {
        Ok(false)
    } else {
        Err(CoercionFailure::Invalid)
    }
}

fn coerce_date(cell: Cell) -> Result<Cell, CoercionFailure> {
    match cell {
        Cell::Date(_) => Ok(cell),
        Cell::Timestamp(value) => Ok(Cell::Date(value.date())),
        Cell::TimestampTz(value) => Ok(Cell::Date(value.date_naive())),
        Cell::String(value) => parse_date(&value)
            .map(Cell::Date)
            .map_err(|_| CoercionFailure::Invalid),
        _ => Err(CoercionFailure::Invalid),
    }
}

fn coerce_time(cell: Cell) -> Result<Cell, CoercionFailure> {
    match cell {
        Cell::Time(_) => Ok(cell),
        Cell::Timestamp(value) => Ok(Cell::Time(value.time())),
        Cell::TimestampTz(value) => Ok(Cell::Time(value.time())),
        Cell::String(value) => parse_time(&value)
            .map(Cell::Time)
            .map_err(|_| CoercionFailure::Invalid),
        _ => Err(CoercionFailure::Invalid),
    }
}

fn coerce_timestamptz(cell: Cell) -> Result<Cell, CoercionFailure> {
    match cell {
        Cell::TimestampTz(_) => Ok(cell),
        Cell::Timestamp(value) => Ok(Cell::TimestampTz(value.and_utc())),
        Cell::Date(value) => Ok(Cell::TimestampTz(
            value.and_time(chrono::NaiveTime::MIN).and_utc(),
        )),
        Cell::String(value) => parse_datetime(&value)
            .map(|parsed| Cell::TimestampTz(parsed.to_utc()))
            .map_err(|_| CoercionFailure::Invalid),
        _ => Err(CoercionFailure::Invalid),
    }
}

fn coerce_timestamp(cell: Cell) -> Result<Cell, CoercionFailure> {
    match cell {
        Cell::Timestamp(_) => Ok(cell),
        Cell::TimestampTz(value) => Ok(Cell::Timestamp(value.naive_utc())),
        Cell::Date(value) => Ok(Cell::Timestamp(value.and_time(chrono::NaiveTime::MIN))),
        Cell::String(value) => parse_datetime(&value)
            .map(|parsed| Cell::Timestamp(parsed.wall_clock()))
            .map_err(|_| CoercionFailure::Invalid),
        _ => Err(CoercionFailure::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn string(value: &str) -> Cell {
        Cell::String(value.to_owned())
    }

    fn numeric(value: &str) -> Cell {
        Cell::Numeric(PgNumeric::from_str(value).unwrap())
    }

    #[test]
    fn null_is_accepted_by_every_type() {
        for logical_type in [
            LogicalType::Text,
            LogicalType::Integer,
            LogicalType::Decimal,
            LogicalType::Boolean,
            LogicalType::Date,
            LogicalType::Time,
            LogicalType::TimestampTz,
            LogicalType::Timestamp,
            LogicalType::Uuid,
            LogicalType::Unrecognized,
        ] {
            assert_eq!(coerce_cell(Cell::Null, logical_type), Ok(Cell::Null));
        }
    }

    #[test]
    fn text_stringifies() {
        assert_eq!(coerce_cell(Cell::I64(3), LogicalType::Text), Ok(string("3")));
        assert_eq!(coerce_cell(Cell::Bool(false), LogicalType::Text), Ok(string("false")));
        assert_eq!(coerce_cell(string("GBP"), LogicalType::Text), Ok(string("GBP")));
    }

    #[test]
    fn integers_require_whole_numbers() {
        assert_eq!(coerce_cell(string(" 42 "), LogicalType::Integer), Ok(Cell::I64(42)));
        assert_eq!(coerce_cell(string("42.0"), LogicalType::Integer), Ok(Cell::I64(42)));
        assert_eq!(coerce_cell(Cell::F64(7.0), LogicalType::Integer), Ok(Cell::I64(7)));
        assert_eq!(coerce_cell(Cell::I32(7), LogicalType::Integer), Ok(Cell::I64(7)));
        assert_eq!(coerce_cell(Cell::Bool(true), LogicalType::Integer), Ok(Cell::I64(1)));
        assert_eq!(
            coerce_cell(string("12.5"), LogicalType::Integer),
            Err(CoercionFailure::NonIntegral)
        );
        assert_eq!(
            coerce_cell(Cell::F64(0.25), LogicalType::Integer),
            Err(CoercionFailure::NonIntegral)
        );
        assert_eq!(
            coerce_cell(string("abc"), LogicalType::Integer),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(string("99999999999999999999"), LogicalType::Integer),
            Err(CoercionFailure::Invalid)
        );
    }

    #[test]
    fn exponents_beyond_the_numeric_range_are_invalid() {
        for value in ["1e100000000", "1e-100000000", "-7E+99999999"] {
            assert_eq!(
                coerce_cell(string(value), LogicalType::Integer),
                Err(CoercionFailure::Invalid)
            );
            assert_eq!(
                coerce_cell(string(value), LogicalType::Decimal),
                Err(CoercionFailure::Invalid)
            );
        }

        let huge = PgNumeric::Value(BigDecimal::new(1.into(), -100_000_000));
        assert_eq!(
            coerce_cell(Cell::Numeric(huge.clone()), LogicalType::Integer),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(Cell::Numeric(huge), LogicalType::Decimal),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(string("1e20"), LogicalType::Integer),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(string("1e18"), LogicalType::Integer),
            Ok(Cell::I64(1_000_000_000_000_000_000))
        );
    }

    #[test]
    fn decimals_keep_their_string_form() {
        assert_eq!(coerce_cell(string("12.50"), LogicalType::Decimal), Ok(numeric("12.50")));
        assert_eq!(coerce_cell(Cell::F64(0.1), LogicalType::Decimal), Ok(numeric("0.1")));
        assert_eq!(coerce_cell(Cell::I64(5), LogicalType::Decimal), Ok(numeric("5")));
        assert_eq!(
            coerce_cell(Cell::F64(f64::INFINITY), LogicalType::Decimal),
            Ok(Cell::Numeric(PgNumeric::PositiveInf))
        );
        assert_eq!(
            coerce_cell(string("NaN"), LogicalType::Decimal),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(string("twelve"), LogicalType::Decimal),
            Err(CoercionFailure::Invalid)
        );
    }

    #[test]
    fn booleans_accept_tokens_and_flags() {
        assert_eq!(coerce_cell(string("Yes"), LogicalType::Boolean), Ok(Cell::Bool(true)));
        assert_eq!(coerce_cell(string("n"), LogicalType::Boolean), Ok(Cell::Bool(false)));
        assert_eq!(coerce_cell(Cell::I64(1), LogicalType::Boolean), Ok(Cell::Bool(true)));
        assert_eq!(coerce_cell(Cell::F64(0.0), LogicalType::Boolean), Ok(Cell::Bool(false)));
        assert_eq!(coerce_cell(numeric("1"), LogicalType::Boolean), Ok(Cell::Bool(true)));
        assert_eq!(
            coerce_cell(string("maybe"), LogicalType::Boolean),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(
            coerce_cell(Cell::I64(2), LogicalType::Boolean),
            Err(CoercionFailure::Invalid)
        );
    }

    #[test]
    fn temporal_columns() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();

        assert_eq!(coerce_cell(string("2024-01-01"), LogicalType::Date), Ok(Cell::Date(date)));
        assert_eq!(
            coerce_cell(string("not-a-date"), LogicalType::Date),
            Err(CoercionFailure::Invalid)
        );
        assert_eq!(coerce_cell(string("10:30:00"), LogicalType::Time), Ok(Cell::Time(time)));
        assert_eq!(
            coerce_cell(Cell::Timestamp(date.and_time(time)), LogicalType::Time),
            Ok(Cell::Time(time))
        );
        assert_eq!(
            coerce_cell(string("2024-01-01 11:30:00+01:00"), LogicalType::TimestampTz),
            Ok(Cell::TimestampTz(date.and_time(time).and_utc()))
        );
        assert_eq!(
            coerce_cell(string("2024-01-01 10:30:00"), LogicalType::TimestampTz),
            Ok(Cell::TimestampTz(date.and_time(time).and_utc()))
        );
        assert_eq!(
            coerce_cell(string("2024-01-01T10:30:00+05:00"), LogicalType::Timestamp),
            Ok(Cell::Timestamp(date.and_time(time)))
        );
        assert_eq!(
            coerce_cell(Cell::I64(1), LogicalType::Timestamp),
            Err(CoercionFailure::Invalid)
        );
    }

    #[test]
    fn uuids_are_strings_without_validation() {
        let id = Uuid::nil();

        assert_eq!(
            coerce_cell(Cell::Uuid(id), LogicalType::Uuid),
            Ok(string("00000000-0000-0000-0000-000000000000"))
        );
        assert_eq!(coerce_cell(string("not-a-uuid"), LogicalType::Uuid), Ok(string("not-a-uuid")));
    }

    #[test]
    fn unrecognized_passes_through() {
        let value = Cell::Json(serde_json::json!({"a": 1}));

        assert_eq!(coerce_cell(value.clone(), LogicalType::Unrecognized), Ok(value));
    }
}
