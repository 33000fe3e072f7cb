use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, EtlError};

/// Write strategy of a warehouse table, derived from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// `dim_` tables, merge-upserted on their first column.
    Dimension,
    /// `fact_` tables, append-only with lineage defaults.
    Fact,
}

impl TableKind {
    pub const DIMENSION_PREFIX: &'static str = "dim_";
    pub const FACT_PREFIX: &'static str = "fact_";

    /// Resolves the kind from the table name, or `None` for an unknown prefix.
    pub fn from_table_name(table: &str) -> Option<TableKind> {
        if table.starts_with(Self::DIMENSION_PREFIX) {
            Some(TableKind::Dimension)
        } else if table.starts_with(Self::FACT_PREFIX) {
            Some(TableKind::Fact)
        } else {
            None
        }
    }

    pub fn operation(self) -> LoadOperation {
        match self {
            TableKind::Dimension => LoadOperation::Upsert,
            TableKind::Fact => LoadOperation::Insert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOperation {
    Upsert,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Success,
    Failed,
}

/// Outcome of loading a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    pub table: String,
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<LoadOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error_kind"
    )]
    pub error_kind: Option<ErrorKind>,
}

impl LoadResult {
    pub fn success(table: impl Into<String>, operation: LoadOperation, rows_loaded: u64) -> Self {
        Self {
            table: table.into(),
            status: LoadStatus::Success,
            operation: Some(operation),
            rows_loaded: Some(rows_loaded),
            error: None,
            error_kind: None,
        }
    }

    /// Builds a failed result carrying the error's description and detail.
    pub fn failed(
        table: impl Into<String>,
        operation: Option<LoadOperation>,
        error: &EtlError,
    ) -> Self {
        Self {
            table: table.into(),
            status: LoadStatus::Failed,
            operation,
            rows_loaded: None,
            error: Some(error.message()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }
}

fn serialize_error_kind<S>(kind: &Option<ErrorKind>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match kind {
        Some(kind) => serializer.serialize_str(&format!("{kind:?}")),
        None => serializer.serialize_none(),
    }
}

/// Per-table results of one load run, in load order.
///
/// Serializes as a map keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    results: Vec<LoadResult>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a result, replacing an earlier result for the same table.
    pub fn push(&mut self, result: LoadResult) {
        match self.results.iter_mut().find(|r| r.table == result.table) {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn results(&self) -> &[LoadResult] {
        &self.results
    }

    pub fn get(&self, table: &str) -> Option<&LoadResult> {
        self.results.iter().find(|r| r.table == table)
    }

    pub fn failed(&self) -> impl Iterator<Item = &LoadResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn rows_loaded(&self) -> u64 {
        self.results.iter().filter_map(|r| r.rows_loaded).sum()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl From<LoadResult> for LoadReport {
    fn from(result: LoadResult) -> Self {
        Self {
            results: vec![result],
        }
    }
}

impl Serialize for LoadReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.results.len()))?;
        for result in &self.results {
            map.serialize_entry(&result.table, result)?;
        }
        map.end()
    }
}
