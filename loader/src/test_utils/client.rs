use std::collections::HashMap;
use std::sync::Arc;

use postgres::schema::{TABLE_COLUMNS_QUERY, TableSchema};
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, TableRow};
use crate::warehouse::WarehouseClient;

/// A statement received by a [`RecordingClient`], with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub statement: String,
    pub params: Vec<Cell>,
}

impl RecordedStatement {
    pub fn is_write(&self) -> bool {
        self.statement.starts_with("INSERT INTO")
    }
}

#[derive(Debug, Default)]
struct Inner {
    statements: Vec<RecordedStatement>,
    schemas: HashMap<String, TableSchema>,
    failing_fragments: Vec<String>,
    fail_rollback: bool,
    fail_catalog_reads: bool,
}

impl Inner {
    fn record(&mut self, statement: &str, params: &[Cell]) -> EtlResult<()> {
        self.statements.push(RecordedStatement {
            statement: statement.to_owned(),
            params: params.to_vec(),
        });

        if self.fail_rollback && statement == "ROLLBACK" {
            bail!(
                ErrorKind::WarehouseQueryFailed,
                "Rollback failed",
                "injected rollback failure"
            );
        }

        if let Some(fragment) = self
            .failing_fragments
            .iter()
            .find(|fragment| statement.contains(fragment.as_str()))
        {
            bail!(
                ErrorKind::WarehouseQueryFailed,
                "Statement failed",
                format!("injected failure for statements containing `{fragment}`")
            );
        }

        Ok(())
    }
}

/// In-memory [`WarehouseClient`] that records every statement it receives.
///
/// Catalog reads are answered from schemas registered with [`RecordingClient::with_schema`];
/// unknown tables have no columns. Failures can be injected per statement fragment.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the catalog columns returned for `table`.
    pub async fn with_schema(&self, table: &str, schema: TableSchema) {
        let mut inner = self.inner.lock().await;
        inner.schemas.insert(table.to_owned(), schema);
    }

    /// Makes every statement containing `fragment` fail after being recorded.
    pub async fn fail_statements_containing(&self, fragment: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_fragments.push(fragment.to_owned());
    }

    pub async fn fail_rollback(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_rollback = true;
    }

    pub async fn fail_catalog_reads(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_catalog_reads = true;
    }

    /// Returns every statement received so far, in order.
    pub async fn statements(&self) -> Vec<RecordedStatement> {
        let inner = self.inner.lock().await;
        inner.statements.clone()
    }

    /// Returns the statement texts received so far, in order.
    pub async fn statement_texts(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .statements
            .iter()
            .map(|recorded| recorded.statement.clone())
            .collect()
    }

    /// Returns only the row writes received so far.
    pub async fn writes(&self) -> Vec<RecordedStatement> {
        let inner = self.inner.lock().await;
        inner
            .statements
            .iter()
            .filter(|recorded| recorded.is_write())
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.statements.clear();
    }
}

impl WarehouseClient for RecordingClient {
    async fn execute(&self, statement: &str, params: &[Cell]) -> EtlResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.record(statement, params)?;

        Ok(1)
    }

    async fn batch_execute(&self, statements: &str) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(statements, &[])
    }

    async fn query(&self, statement: &str, params: &[Cell]) -> EtlResult<Vec<TableRow>> {
        let mut inner = self.inner.lock().await;
        inner.record(statement, params)?;

        if inner.fail_catalog_reads {
            bail!(
                ErrorKind::WarehouseQueryFailed,
                "Catalog read failed",
                "injected catalog failure"
            );
        }

        if statement != TABLE_COLUMNS_QUERY {
            return Ok(vec![]);
        }

        let Some(Cell::String(table)) = params.get(1) else {
            return Ok(vec![]);
        };

        let rows = inner
            .schemas
            .get(table)
            .map(|schema| {
                schema
                    .iter()
                    .map(|column| {
                        let is_nullable = if column.nullable { "YES" } else { "NO" };
                        TableRow::new(vec![
                            Cell::String(column.name.clone()),
                            Cell::String(column.data_type.clone()),
                            Cell::String(is_nullable.to_owned()),
                        ])
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(rows)
    }
}
