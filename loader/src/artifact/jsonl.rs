use std::str::FromStr;

use serde_json::{Map, Value};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, PgNumeric, TableRow, TabularValue};

/// Decodes newline-delimited JSON records into a [`TabularValue`].
///
/// Columns appear in first-seen order across all records. Keys missing from a record become
/// [`Cell::Null`]. Blank lines are skipped.
pub fn decode_json_lines(bytes: &[u8]) -> EtlResult<TabularValue> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        crate::etl_error!(
            ErrorKind::DeserializationError,
            "Artifact is not valid UTF-8",
            source: err
        )
    })?;

    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<Map<String, Value>> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record = match serde_json::from_str::<Value>(line)? {
            Value::Object(record) => record,
            other => bail!(
                ErrorKind::DeserializationError,
                "JSON lines record is not an object",
                format!("Line {} holds a {}", line_no + 1, json_type_name(&other))
            ),
        };

        for key in record.keys() {
            if !columns.iter().any(|column| column == key) {
                columns.push(key.clone());
            }
        }
        records.push(record);
    }

    let mut rows = Vec::with_capacity(records.len());
    for mut record in records {
        let cells = columns
            .iter()
            .map(|column| json_to_cell(record.remove(column).unwrap_or(Value::Null)))
            .collect::<EtlResult<Vec<_>>>()?;
        rows.push(TableRow::new(cells));
    }

    TabularValue::new(columns, rows)
}

fn json_to_cell(value: Value) -> EtlResult<Cell> {
    let cell = match value {
        Value::Null => Cell::Null,
        Value::Bool(value) => Cell::Bool(value),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Cell::I64(value)
            } else if number.is_u64() {
                Cell::Numeric(PgNumeric::from_str(&number.to_string())?)
            } else {
                match number.as_f64() {
                    Some(value) => Cell::F64(value),
                    None => Cell::Numeric(PgNumeric::from_str(&number.to_string())?),
                }
            }
        }
        Value::String(value) => Cell::String(value),
        value @ (Value::Array(_) | Value::Object(_)) => Cell::Json(value),
    };

    Ok(cell)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
