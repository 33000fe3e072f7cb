use std::error::Error;
use std::str::FromStr;

use bigdecimal::ToPrimitive;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

use crate::conversions::bool::parse_bool;
use crate::conversions::numeric::PgNumeric;
use crate::conversions::temporal::{parse_date, parse_datetime, parse_time};
use crate::error::ErrorKind;
use crate::etl_error;
use crate::types::Cell;

type BoxError = Box<dyn Error + Sync + Send>;

/// Builds the error returned when a cell cannot be encoded as the parameter type.
fn mismatch(cell: &Cell, ty: &Type) -> BoxError {
    Box::new(etl_error!(
        ErrorKind::ConversionError,
        "Cell cannot be encoded as the column type",
        format!("Cannot encode {cell:?} as {ty}")
    ))
}

impl Cell {
    fn as_bool(&self, ty: &Type) -> Result<bool, BoxError> {
        match self {
            Cell::Bool(value) => Ok(*value),
            Cell::String(value) => Ok(parse_bool(value)?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_i64(&self, ty: &Type) -> Result<i64, BoxError> {
        match self {
            Cell::Bool(value) => Ok(i64::from(*value)),
            Cell::I16(value) => Ok(i64::from(*value)),
            Cell::I32(value) => Ok(i64::from(*value)),
            Cell::I64(value) => Ok(*value),
            Cell::U32(value) => Ok(i64::from(*value)),
            Cell::Numeric(numeric @ PgNumeric::Value(value))
                if numeric.is_integral() && numeric.integer_digits().is_some_and(|d| d <= 19) =>
            {
                value.to_i64().ok_or_else(|| mismatch(self, ty))
            }
            Cell::String(value) => Ok(value.trim().parse::<i64>()?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_f64(&self, ty: &Type) -> Result<f64, BoxError> {
        match self {
            Cell::I16(value) => Ok(f64::from(*value)),
            Cell::I32(value) => Ok(f64::from(*value)),
            Cell::I64(value) => Ok(*value as f64),
            Cell::U32(value) => Ok(f64::from(*value)),
            Cell::F32(value) => Ok(f64::from(*value)),
            Cell::F64(value) => Ok(*value),
            Cell::Numeric(numeric @ PgNumeric::Value(value)) if numeric.fits_numeric_range() => {
                value.to_f64().ok_or_else(|| mismatch(self, ty))
            }
            Cell::Numeric(PgNumeric::NaN) => Ok(f64::NAN),
            Cell::Numeric(PgNumeric::PositiveInf) => Ok(f64::INFINITY),
            Cell::Numeric(PgNumeric::NegativeInf) => Ok(f64::NEG_INFINITY),
            Cell::String(value) => Ok(value.trim().parse::<f64>()?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_numeric(&self, ty: &Type) -> Result<PgNumeric, BoxError> {
        match self {
            Cell::Numeric(value) => Ok(value.clone()),
            Cell::I16(value) => Ok(PgNumeric::from(i64::from(*value))),
            Cell::I32(value) => Ok(PgNumeric::from(i64::from(*value))),
            Cell::I64(value) => Ok(PgNumeric::from(*value)),
            Cell::U32(value) => Ok(PgNumeric::from(i64::from(*value))),
            Cell::F32(value) => PgNumeric::from_f64(f64::from(*value)).ok_or_else(|| mismatch(self, ty)),
            Cell::F64(value) => PgNumeric::from_f64(*value).ok_or_else(|| mismatch(self, ty)),
            Cell::String(value) => Ok(PgNumeric::from_str(value)?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_date(&self, ty: &Type) -> Result<NaiveDate, BoxError> {
        match self {
            Cell::Date(value) => Ok(*value),
            Cell::Timestamp(value) => Ok(value.date()),
            Cell::TimestampTz(value) => Ok(value.date_naive()),
            Cell::String(value) => Ok(parse_date(value)?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_time(&self, ty: &Type) -> Result<NaiveTime, BoxError> {
        match self {
            Cell::Time(value) => Ok(*value),
            Cell::Timestamp(value) => Ok(value.time()),
            Cell::TimestampTz(value) => Ok(value.time()),
            Cell::String(value) => Ok(parse_time(value)?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_timestamp(&self, ty: &Type) -> Result<NaiveDateTime, BoxError> {
        match self {
            Cell::Timestamp(value) => Ok(*value),
            Cell::TimestampTz(value) => Ok(value.naive_utc()),
            Cell::Date(value) => Ok(value.and_time(NaiveTime::MIN)),
            Cell::String(value) => Ok(parse_datetime(value)?.wall_clock()),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_timestamptz(&self, ty: &Type) -> Result<DateTime<Utc>, BoxError> {
        match self {
            Cell::TimestampTz(value) => Ok(*value),
            Cell::Timestamp(value) => Ok(value.and_utc()),
            Cell::Date(value) => Ok(value.and_time(NaiveTime::MIN).and_utc()),
            Cell::String(value) => Ok(parse_datetime(value)?.to_utc()),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_uuid(&self, ty: &Type) -> Result<Uuid, BoxError> {
        match self {
            Cell::Uuid(value) => Ok(*value),
            Cell::String(value) => Ok(Uuid::parse_str(value.trim())?),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn as_json(&self) -> serde_json::Value {
        match self {
            Cell::Json(value) => value.clone(),
            Cell::Bool(value) => serde_json::Value::Bool(*value),
            Cell::I16(value) => serde_json::Value::from(*value),
            Cell::I32(value) => serde_json::Value::from(*value),
            Cell::I64(value) => serde_json::Value::from(*value),
            Cell::U32(value) => serde_json::Value::from(*value),
            Cell::F32(value) => serde_json::Value::from(*value),
            Cell::F64(value) => serde_json::Value::from(*value),
            // Text holding a JSON document is sent as that document.
            Cell::String(value) => serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone())),
            other => other
                .to_text()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
        }
    }
}

/// Encodes a cell as the binary representation of the parameter type the server asked for.
///
/// Cells are converted to the column type where a lossless conversion exists. Anything else
/// is sent in its text form.
impl ToSql for Cell {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }

        match *ty {
            Type::BOOL => self.as_bool(ty)?.to_sql(ty, out),
            Type::INT2 => i16::try_from(self.as_i64(ty)?)?.to_sql(ty, out),
            Type::INT4 => i32::try_from(self.as_i64(ty)?)?.to_sql(ty, out),
            Type::INT8 => self.as_i64(ty)?.to_sql(ty, out),
            Type::FLOAT4 => (self.as_f64(ty)? as f32).to_sql(ty, out),
            Type::FLOAT8 => self.as_f64(ty)?.to_sql(ty, out),
            Type::NUMERIC => self.as_numeric(ty)?.to_sql(ty, out),
            Type::DATE => self.as_date(ty)?.to_sql(ty, out),
            Type::TIME => self.as_time(ty)?.to_sql(ty, out),
            Type::TIMESTAMP => self.as_timestamp(ty)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => self.as_timestamptz(ty)?.to_sql(ty, out),
            Type::UUID => self.as_uuid(ty)?.to_sql(ty, out),
            Type::JSON | Type::JSONB => self.as_json().to_sql(ty, out),
            Type::BYTEA => match self {
                Cell::Bytes(value) => value.to_sql(ty, out),
                Cell::String(value) => value.as_bytes().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            _ => match self.to_text() {
                Some(text) => text.to_sql(ty, out),
                None => Ok(IsNull::Yes),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
