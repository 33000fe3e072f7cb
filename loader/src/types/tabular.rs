use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, TableRow};

/// An untyped table read from an artifact: a column header plus rows of [`Cell`]s.
///
/// Every row holds exactly one cell per header column, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularValue {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl TabularValue {
    /// Creates a tabular value, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<TableRow>) -> EtlResult<Self> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                bail!(
                    ErrorKind::InvalidData,
                    "Row width does not match the column header",
                    format!(
                        "Row {index} has {} values but the header has {} columns",
                        row.len(),
                        columns.len()
                    )
                );
            }
        }

        Ok(Self { columns, rows })
    }

    /// Creates a tabular value with a header and no rows.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Returns mutable access to the rows. Cells can be replaced but rows cannot change width.
    pub fn rows_mut(&mut self) -> &mut [TableRow] {
        &mut self.rows
    }

    /// Returns the position of `column` in the header.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when there is no cell at all, either because there are no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Returns the values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row.values()[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["currency_id".to_owned(), "currency_code".to_owned()]
    }

    #[test]
    fn rows_must_match_header_width() {
        let err = TabularValue::new(columns(), vec![TableRow::new(vec![Cell::I64(1)])]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(
            err.detail(),
            Some("Row 0 has 1 values but the header has 2 columns")
        );
    }

    #[test]
    fn column_lookup() {
        let value = TabularValue::new(
            columns(),
            vec![TableRow::new(vec![Cell::I64(1), Cell::from("GBP")])],
        )
        .unwrap();

        assert_eq!(value.column_index("currency_code"), Some(1));
        assert_eq!(
            value.column_values("currency_code").unwrap(),
            vec![&Cell::from("GBP")]
        );
        assert!(value.column_values("missing").is_none());
        assert!(!value.is_empty());
    }

    #[test]
    fn emptiness() {
        assert!(TabularValue::default().is_empty());
        assert!(TabularValue::with_columns(columns()).is_empty());
        assert!(
            TabularValue::new(Vec::new(), vec![TableRow::new(Vec::new())])
                .unwrap()
                .is_empty()
        );
    }
}
