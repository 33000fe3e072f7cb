//! Schema-driven coercion of artifact values into warehouse column types.
//!
//! Every cell of a column known to the warehouse catalog is converted to the column's
//! [`LogicalType`]. Values that do not fit become null and are counted per column. Counts are
//! logged and exported as metrics, never raised.

mod cell;

use std::collections::BTreeMap;

use metrics::counter;
use postgres::schema::{LogicalType, TableSchema};
use tracing::{debug, info, warn};

use crate::metrics::{LOADER_COERCED_NULLS_TOTAL, TABLE_NAME_LABEL};
use crate::types::{Cell, TabularValue};

pub use cell::{CoercionFailure, coerce_cell};

/// Per-column counters collected while coercing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCoercionStats {
    /// Values that could not be parsed and were set to null.
    pub invalid: u64,
    /// Numeric values with a fractional part in an integer column, set to null.
    pub non_integral: u64,
    /// Nulls in a NOT NULL text column replaced by the text default.
    pub defaulted: u64,
}

impl ColumnCoercionStats {
    /// Returns the number of non-null values that were replaced by null.
    pub fn nulled(&self) -> u64 {
        self.invalid + self.non_integral
    }

    fn record(&mut self, failure: CoercionFailure) {
        match failure {
            CoercionFailure::Invalid => self.invalid += 1,
            CoercionFailure::NonIntegral => self.non_integral += 1,
        }
    }
}

/// Coerced data together with the counters collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionOutcome {
    pub data: TabularValue,
    pub stats: BTreeMap<String, ColumnCoercionStats>,
}

impl CoercionOutcome {
    fn unchanged(data: TabularValue) -> Self {
        Self {
            data,
            stats: BTreeMap::new(),
        }
    }

    /// Returns the counters of `column`, all zero when the column was not coerced.
    pub fn column_stats(&self, column: &str) -> ColumnCoercionStats {
        self.stats.get(column).copied().unwrap_or_default()
    }

    pub fn total_nulled(&self) -> u64 {
        self.stats.values().map(ColumnCoercionStats::nulled).sum()
    }
}

/// Replaces the missing sentinels (`NaN` floats and numerics) by [`Cell::Null`].
fn normalize_missing(data: &mut TabularValue) {
    for row in data.rows_mut() {
        for cell in row.values_mut() {
            if cell.is_missing_sentinel() {
                *cell = Cell::Null;
            }
        }
    }
}

/// Coerces `data` to the column contracts in `schema`.
///
/// Only columns present in both the data and the schema are coerced. Columns that only exist in
/// the data pass through and schema-only columns are not added. Nulls in NOT NULL text columns
/// are replaced by `text_default`.
pub fn coerce(
    table: &str,
    mut data: TabularValue,
    schema: &TableSchema,
    text_default: &str,
) -> CoercionOutcome {
    if data.is_empty() {
        info!(table, "coercion skipped, empty input");
        return CoercionOutcome::unchanged(data);
    }

    normalize_missing(&mut data);

    if schema.is_empty() {
        warn!(table, "coercion skipped, no schema columns found");
        return CoercionOutcome::unchanged(data);
    }

    info!(
        table,
        schema_columns = schema.len(),
        data_columns = data.columns().len(),
        rows = data.num_rows(),
        "coercing table"
    );

    let mut stats = BTreeMap::new();
    let columns = data.columns().to_vec();
    for (index, column) in columns.iter().enumerate() {
        let Some(column_schema) = schema.get(column) else {
            debug!(table, column = %column, "column not in warehouse schema, skipping");
            continue;
        };

        let logical_type = column_schema.logical_type;
        let fill_default = logical_type == LogicalType::Text && !column_schema.nullable;
        let mut column_stats = ColumnCoercionStats::default();

        for row in data.rows_mut() {
            let cell = &mut row.values_mut()[index];
            let value = std::mem::replace(cell, Cell::Null);

            *cell = match coerce_cell(value, logical_type) {
                Ok(coerced) => coerced,
                Err(failure) => {
                    column_stats.record(failure);
                    Cell::Null
                }
            };

            if fill_default && cell.is_null() {
                *cell = Cell::String(text_default.to_owned());
                column_stats.defaulted += 1;
            }
        }

        log_column_stats(table, column, logical_type, &column_stats);
        stats.insert(column.clone(), column_stats);
    }

    CoercionOutcome { data, stats }
}

fn log_column_stats(
    table: &str,
    column: &str,
    logical_type: LogicalType,
    stats: &ColumnCoercionStats,
) {
    if stats.invalid > 0 {
        warn!(
            table,
            column,
            %logical_type,
            invalid_values = stats.invalid,
            "invalid values set to null"
        );
    }
    if stats.non_integral > 0 {
        warn!(
            table,
            column,
            %logical_type,
            non_integer_values = stats.non_integral,
            "non-integer values set to null"
        );
    }
    if stats.defaulted > 0 {
        debug!(
            table,
            column,
            defaulted = stats.defaulted,
            "null text values replaced by default"
        );
    }

    if stats.nulled() > 0 {
        counter!(
            LOADER_COERCED_NULLS_TOTAL,
            TABLE_NAME_LABEL => table.to_owned(),
        )
        .increment(stats.nulled());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableRow;
    use chrono::NaiveDate;
    use postgres::schema::ColumnSchema;

    fn single_column(column: &str, cells: Vec<Cell>) -> TabularValue {
        TabularValue::new(
            vec![column.to_owned()],
            cells.into_iter().map(|cell| TableRow::new(vec![cell])).collect(),
        )
        .unwrap()
    }

    fn schema(columns: &[(&str, &str, bool)]) -> TableSchema {
        columns
            .iter()
            .map(|(name, data_type, nullable)| ColumnSchema::new(*name, *data_type, *nullable))
            .collect()
    }

    fn values(outcome: &CoercionOutcome, column: &str) -> Vec<Cell> {
        outcome
            .data
            .column_values(column)
            .unwrap()
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        let data = TabularValue::with_columns(vec!["currency_id".to_owned()]);
        let outcome = coerce(
            "dim_currency",
            data.clone(),
            &schema(&[("currency_id", "integer", false)]),
            "Unknown",
        );

        assert_eq!(outcome.data, data);
        assert!(outcome.stats.is_empty());
    }

    #[test]
    fn empty_schema_returns_input_with_missing_values_normalized() {
        let data = single_column("rate", vec![Cell::F64(f64::NAN), Cell::F64(1.5)]);
        let outcome = coerce("dim_currency", data, &TableSchema::default(), "Unknown");

        assert_eq!(values(&outcome, "rate"), vec![Cell::Null, Cell::F64(1.5)]);
        assert!(outcome.stats.is_empty());
    }

    #[test]
    fn out_of_range_exponents_become_null() {
        let data = single_column(
            "sales_staff_id",
            vec![Cell::from("1e100000000"), Cell::from("1e-100000000"), Cell::from("7")],
        );
        let outcome = coerce(
            "fact_sales_order",
            data,
            &schema(&[("sales_staff_id", "integer", true)]),
            "Unknown",
        );

        assert_eq!(
            values(&outcome, "sales_staff_id"),
            vec![Cell::Null, Cell::Null, Cell::I64(7)]
        );
        assert_eq!(outcome.column_stats("sales_staff_id").invalid, 2);
        assert_eq!(outcome.column_stats("sales_staff_id").non_integral, 0);
    }

    #[test]
    fn non_numeric_strings_in_integer_columns_become_null() {
        let data = single_column(
            "staff_id",
            vec![Cell::from("abc"), Cell::from("x1"), Cell::from("")],
        );
        let outcome = coerce(
            "dim_staff",
            data,
            &schema(&[("staff_id", "integer", true)]),
            "Unknown",
        );

        assert_eq!(values(&outcome, "staff_id"), vec![Cell::Null; 3]);
        assert_eq!(outcome.column_stats("staff_id").invalid, 3);
        assert_eq!(outcome.total_nulled(), 3);
    }

    #[test]
    fn fractional_values_in_integer_columns_become_null() {
        let data = single_column("units_sold", vec![Cell::F64(2.5), Cell::F64(3.0)]);
        let outcome = coerce(
            "fact_sales_order",
            data,
            &schema(&[("units_sold", "integer", false)]),
            "Unknown",
        );

        assert_eq!(values(&outcome, "units_sold"), vec![Cell::Null, Cell::I64(3)]);
        assert_eq!(
            outcome.column_stats("units_sold"),
            ColumnCoercionStats {
                invalid: 0,
                non_integral: 1,
                defaulted: 0
            }
        );
    }

    #[test]
    fn unknown_boolean_tokens_become_null() {
        let data = single_column("flag", vec![Cell::from("maybe"), Cell::from("t")]);
        let outcome = coerce(
            "dim_flags",
            data,
            &schema(&[("flag", "boolean", true)]),
            "Unknown",
        );

        assert_eq!(values(&outcome, "flag"), vec![Cell::Null, Cell::Bool(true)]);
        assert_eq!(outcome.column_stats("flag").invalid, 1);
    }

    #[test]
    fn not_null_text_is_filled_and_nullable_text_keeps_null() {
        let data = TabularValue::new(
            vec!["required".to_owned(), "optional".to_owned()],
            vec![TableRow::new(vec![Cell::Null, Cell::Null])],
        )
        .unwrap();
        let outcome = coerce(
            "dim_location",
            data,
            &schema(&[
                ("required", "character varying", false),
                ("optional", "text", true),
            ]),
            "N/A",
        );

        assert_eq!(values(&outcome, "required"), vec![Cell::from("N/A")]);
        assert_eq!(values(&outcome, "optional"), vec![Cell::Null]);
        assert_eq!(outcome.column_stats("required").defaulted, 1);
    }

    #[test]
    fn invalid_dates_are_counted_and_valid_dates_are_clean() {
        let data = single_column("date_id", vec![Cell::from("not-a-date")]);
        let outcome = coerce(
            "dim_date",
            data,
            &schema(&[("date_id", "date", false)]),
            "Unknown",
        );
        assert_eq!(values(&outcome, "date_id"), vec![Cell::Null]);
        assert_eq!(outcome.column_stats("date_id").invalid, 1);

        let data = single_column("date_id", vec![Cell::from("2024-01-01")]);
        let outcome = coerce(
            "dim_date",
            data,
            &schema(&[("date_id", "date", false)]),
            "Unknown",
        );
        assert_eq!(
            values(&outcome, "date_id"),
            vec![Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())]
        );
        assert_eq!(outcome.total_nulled(), 0);
    }

    #[test]
    fn data_only_columns_pass_through_and_schema_only_columns_are_not_added() {
        let data = TabularValue::new(
            vec!["currency_id".to_owned(), "extra".to_owned()],
            vec![TableRow::new(vec![Cell::from("1"), Cell::from("kept")])],
        )
        .unwrap();
        let outcome = coerce(
            "dim_currency",
            data,
            &schema(&[
                ("currency_id", "integer", false),
                ("currency_name", "character varying", false),
            ]),
            "Unknown",
        );

        assert_eq!(outcome.data.columns(), &["currency_id", "extra"]);
        assert_eq!(
            outcome.data.rows()[0].values(),
            &[Cell::I64(1), Cell::from("kept")]
        );
        assert!(!outcome.stats.contains_key("extra"));
    }
}
