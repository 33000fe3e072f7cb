use std::str::FromStr;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Date64Array, Decimal128Array,
    Decimal256Array, FixedSizeBinaryArray, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, LargeBinaryArray, LargeStringArray, RecordBatch, StringArray,
    Time32MillisecondArray, Time32SecondArray, Time64MicrosecondArray, Time64NanosecondArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use uuid::Uuid;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::{Cell, PgNumeric, TableRow, TabularValue};

/// Decodes a parquet file into a [`TabularValue`], keeping the file's column order.
pub fn decode_parquet(bytes: Bytes) -> EtlResult<TabularValue> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect::<Vec<_>>();

    let reader = builder.build()?;
    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(record_batch_to_table_rows(&batch?)?);
    }

    TabularValue::new(columns, rows)
}

/// Converts a record batch to table rows.
pub fn record_batch_to_table_rows(batch: &RecordBatch) -> EtlResult<Vec<TableRow>> {
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut cells = Vec::with_capacity(batch.num_columns());

        for col_idx in 0..batch.num_columns() {
            let column = batch.column(col_idx);
            let cell = arrow_value_to_cell(column, row_idx)?;
            cells.push(cell);
        }

        rows.push(TableRow::new(cells));
    }

    Ok(rows)
}

fn downcast<'a, T: Array + 'static>(array: &'a ArrayRef, name: &'static str) -> EtlResult<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        etl_error!(
            ErrorKind::DeserializationError,
            "Failed to downcast Arrow array",
            format!("Expected {name} for data type {}", array.data_type())
        )
    })
}

fn out_of_range(array: &ArrayRef) -> crate::error::EtlError {
    etl_error!(
        ErrorKind::DeserializationError,
        "Arrow temporal value out of range",
        format!("Value of type {} cannot be represented", array.data_type())
    )
}

fn timestamp_cell(value: NaiveDateTime, tz: &Option<std::sync::Arc<str>>) -> Cell {
    // Zoned arrow timestamps hold UTC instants.
    match tz {
        Some(_) => Cell::TimestampTz(value.and_utc()),
        None => Cell::Timestamp(value),
    }
}

/// Converts an Arrow array value at a specific index to a [`Cell`].
fn arrow_value_to_cell(array: &ArrayRef, row_idx: usize) -> EtlResult<Cell> {
    if array.is_null(row_idx) {
        return Ok(Cell::Null);
    }

    let cell = match array.data_type() {
        DataType::Null => Cell::Null,
        DataType::Boolean => Cell::Bool(downcast::<BooleanArray>(array, "BooleanArray")?.value(row_idx)),
        DataType::Int8 => Cell::I16(i16::from(downcast::<Int8Array>(array, "Int8Array")?.value(row_idx))),
        DataType::Int16 => Cell::I16(downcast::<Int16Array>(array, "Int16Array")?.value(row_idx)),
        DataType::Int32 => Cell::I32(downcast::<Int32Array>(array, "Int32Array")?.value(row_idx)),
        DataType::Int64 => Cell::I64(downcast::<Int64Array>(array, "Int64Array")?.value(row_idx)),
        DataType::UInt8 => Cell::I16(i16::from(downcast::<UInt8Array>(array, "UInt8Array")?.value(row_idx))),
        DataType::UInt16 => Cell::I32(i32::from(downcast::<UInt16Array>(array, "UInt16Array")?.value(row_idx))),
        DataType::UInt32 => Cell::U32(downcast::<UInt32Array>(array, "UInt32Array")?.value(row_idx)),
        DataType::UInt64 => {
            let value = downcast::<UInt64Array>(array, "UInt64Array")?.value(row_idx);
            match i64::try_from(value) {
                Ok(value) => Cell::I64(value),
                Err(_) => Cell::Numeric(PgNumeric::from_str(&value.to_string())?),
            }
        }
        DataType::Float32 => Cell::F32(downcast::<Float32Array>(array, "Float32Array")?.value(row_idx)),
        DataType::Float64 => Cell::F64(downcast::<Float64Array>(array, "Float64Array")?.value(row_idx)),
        DataType::Decimal128(_, _) => {
            let value = downcast::<Decimal128Array>(array, "Decimal128Array")?.value_as_string(row_idx);
            Cell::Numeric(PgNumeric::from_str(&value)?)
        }
        DataType::Decimal256(_, _) => {
            let value = downcast::<Decimal256Array>(array, "Decimal256Array")?.value_as_string(row_idx);
            Cell::Numeric(PgNumeric::from_str(&value)?)
        }
        DataType::Utf8 => Cell::String(downcast::<StringArray>(array, "StringArray")?.value(row_idx).to_owned()),
        DataType::LargeUtf8 => Cell::String(
            downcast::<LargeStringArray>(array, "LargeStringArray")?
                .value(row_idx)
                .to_owned(),
        ),
        DataType::Binary => Cell::Bytes(downcast::<BinaryArray>(array, "BinaryArray")?.value(row_idx).to_vec()),
        DataType::LargeBinary => Cell::Bytes(
            downcast::<LargeBinaryArray>(array, "LargeBinaryArray")?
                .value(row_idx)
                .to_vec(),
        ),
        DataType::FixedSizeBinary(16) => {
            let bytes = downcast::<FixedSizeBinaryArray>(array, "FixedSizeBinaryArray")?.value(row_idx);
            match Uuid::from_slice(bytes) {
                Ok(uuid) => Cell::Uuid(uuid),
                Err(_) => Cell::Bytes(bytes.to_vec()),
            }
        }
        DataType::Date32 => Cell::Date(
            downcast::<Date32Array>(array, "Date32Array")?
                .value_as_date(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Date64 => Cell::Date(
            downcast::<Date64Array>(array, "Date64Array")?
                .value_as_date(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Time32(TimeUnit::Second) => Cell::Time(
            downcast::<Time32SecondArray>(array, "Time32SecondArray")?
                .value_as_time(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Time32(TimeUnit::Millisecond) => Cell::Time(
            downcast::<Time32MillisecondArray>(array, "Time32MillisecondArray")?
                .value_as_time(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Time64(TimeUnit::Microsecond) => Cell::Time(
            downcast::<Time64MicrosecondArray>(array, "Time64MicrosecondArray")?
                .value_as_time(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Time64(TimeUnit::Nanosecond) => Cell::Time(
            downcast::<Time64NanosecondArray>(array, "Time64NanosecondArray")?
                .value_as_time(row_idx)
                .ok_or_else(|| out_of_range(array))?,
        ),
        DataType::Timestamp(TimeUnit::Second, tz) => timestamp_cell(
            downcast::<TimestampSecondArray>(array, "TimestampSecondArray")?
                .value_as_datetime(row_idx)
                .ok_or_else(|| out_of_range(array))?,
            tz,
        ),
        DataType::Timestamp(TimeUnit::Millisecond, tz) => timestamp_cell(
            downcast::<TimestampMillisecondArray>(array, "TimestampMillisecondArray")?
                .value_as_datetime(row_idx)
                .ok_or_else(|| out_of_range(array))?,
            tz,
        ),
        DataType::Timestamp(TimeUnit::Microsecond, tz) => timestamp_cell(
            downcast::<TimestampMicrosecondArray>(array, "TimestampMicrosecondArray")?
                .value_as_datetime(row_idx)
                .ok_or_else(|| out_of_range(array))?,
            tz,
        ),
        DataType::Timestamp(TimeUnit::Nanosecond, tz) => timestamp_cell(
            downcast::<TimestampNanosecondArray>(array, "TimestampNanosecondArray")?
                .value_as_datetime(row_idx)
                .ok_or_else(|| out_of_range(array))?,
            tz,
        ),
        // Nested and exotic types are carried as their display form.
        _ => Cell::String(array_value_to_string(array, row_idx)?),
    };

    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::datatypes::{Field, Schema};
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;

    fn write_parquet(batch: &RecordBatch) -> Bytes {
        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn decodes_columns_in_file_order() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("currency_id", DataType::Int64, false),
            Field::new("currency_code", DataType::Utf8, true),
            Field::new("rate", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("GBP"), None])),
                Arc::new(Float64Array::from(vec![Some(1.0), Some(f64::NAN)])),
            ],
        )
        .unwrap();

        let value = decode_parquet(write_parquet(&batch)).unwrap();

        assert_eq!(value.columns(), &["currency_id", "currency_code", "rate"]);
        assert_eq!(value.num_rows(), 2);
        assert_eq!(
            value.rows()[0].values(),
            &[Cell::I64(1), Cell::from("GBP"), Cell::F64(1.0)]
        );
        assert_eq!(value.rows()[1].values()[1], Cell::Null);
        assert!(value.rows()[1].values()[2].is_missing_sentinel());
    }

    #[test]
    fn decodes_temporal_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("calendar_date", DataType::Date32, false),
            Field::new(
                "created_at",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new(
                "updated_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Date32Array::from(vec![19723])),
                Arc::new(TimestampMillisecondArray::from(vec![1_704_067_200_000])),
                Arc::new(
                    TimestampMicrosecondArray::from(vec![1_704_067_200_000_000])
                        .with_timezone("UTC"),
                ),
            ],
        )
        .unwrap();

        let value = decode_parquet(write_parquet(&batch)).unwrap();
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(
            value.rows()[0].values(),
            &[
                Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Cell::Timestamp(midnight),
                Cell::TimestampTz(midnight.and_utc()),
            ]
        );
    }

    #[test]
    fn rejects_non_parquet_bytes() {
        let err = decode_parquet(Bytes::from_static(b"not parquet")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
