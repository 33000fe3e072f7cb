use crate::types::Cell;

/// One record of a [`crate::types::TabularValue`].
///
/// Values are ordered to match the header of the tabular value the row belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    values: Vec<Cell>,
}

impl TableRow {
    /// Creates a new table row with the given cell values.
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns the row values in header order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Returns mutable access to the row values in header order.
    pub fn values_mut(&mut self) -> &mut [Cell] {
        &mut self.values
    }

    /// Consumes the row and returns its values in header order.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Cell>> for TableRow {
    fn from(values: Vec<Cell>) -> Self {
        Self::new(values)
    }
}
