use std::sync::Arc;
use std::time::Instant;

use config::shared::LoaderConfig;
use metrics::{counter, histogram};
use postgres::schema::TableSchema;
use tracing::{error, info, warn};

use crate::artifact::ArtifactLocator;
use crate::coercion::coerce;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::metrics::{
    LOADER_ROWS_LOADED_TOTAL, LOADER_TABLE_LOAD_DURATION_SECONDS, LOADER_TABLE_LOADS_TOTAL,
    OPERATION_LABEL, STATUS_LABEL, TABLE_NAME_LABEL, register_metrics,
};
use crate::plan::LoadPlan;
use crate::types::{LoadOperation, LoadReport, LoadResult, TableKind};
use crate::warehouse::{WarehouseClient, WarehouseWriter, ensure_dimensional_model, read_schema};

/// Drives locate, read schema, coerce and write for each table.
///
/// Tables are loaded one after the other on a single warehouse session. A failing table is
/// reported and never stops the remaining tables.
#[derive(Debug)]
pub struct LoadOrchestrator<C> {
    locator: ArtifactLocator,
    writer: WarehouseWriter<C>,
    text_default: String,
    plan: LoadPlan,
}

impl<C> LoadOrchestrator<C>
where
    C: WarehouseClient,
{
    /// Creates an orchestrator, validating the configured load plan.
    pub fn new(locator: ArtifactLocator, client: Arc<C>, config: &LoaderConfig) -> EtlResult<Self> {
        register_metrics();

        let plan = LoadPlan::from_config(config.tables.as_deref())?;
        let writer = WarehouseWriter::new(client, config.namespace.as_str(), config.write_chunk_size);

        Ok(Self {
            locator,
            writer,
            text_default: config.text_default.clone(),
            plan,
        })
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Creates the dimensional model tables if they do not exist.
    pub async fn ensure_schema(&self) -> EtlResult<()> {
        ensure_dimensional_model(self.writer.client().as_ref(), self.writer.namespace()).await
    }

    /// Loads one table from its newest artifact. Every error becomes a failed result.
    pub async fn load_table(&self, table: &str) -> LoadResult {
        let started = Instant::now();

        let result = match TableKind::from_table_name(table) {
            None => {
                let err = etl_error!(
                    ErrorKind::UnknownTableKind,
                    "Unknown table type",
                    format!("Table {table} has neither the dim_ nor the fact_ prefix")
                );
                error!(table, error = %err.message(), "table load failed");
                LoadResult::failed(table, None, &err)
            }
            Some(kind) => match self.try_load_table(table, kind).await {
                Ok(rows_loaded) => {
                    info!(table, rows_loaded, operation = ?kind.operation(), "table loaded");
                    LoadResult::success(table, kind.operation(), rows_loaded)
                }
                Err(err) => {
                    error!(table, error = %err, "table load failed");
                    LoadResult::failed(table, Some(kind.operation()), &err)
                }
            },
        };

        record_table_load(&result, started);

        result
    }

    async fn try_load_table(&self, table: &str, kind: TableKind) -> EtlResult<u64> {
        let data = self.locator.locate(table).await?;

        let client = self.writer.client().as_ref();
        let schema = match read_schema(client, self.writer.namespace(), table).await {
            Ok(schema) => schema,
            Err(err) => {
                let err: EtlError = etl_error!(
                    ErrorKind::SchemaUnavailable,
                    "Warehouse schema unavailable",
                    format!("Reading the catalog for {table} failed: {}", err.message()),
                    source: err
                );
                warn!(table, error = %err.message(), "loading without schema coercion");
                TableSchema::default()
            }
        };

        let outcome = coerce(table, data, &schema, &self.text_default);

        match kind {
            TableKind::Dimension => self.writer.merge_upsert(table, &outcome.data).await,
            TableKind::Fact => self.writer.insert_with_lineage(table, &outcome.data).await,
        }
    }

    /// Ensures the warehouse tables exist, then loads every table of the plan in order.
    ///
    /// Only a failure to create the tables is returned as an error.
    pub async fn load_all(&self) -> EtlResult<LoadReport> {
        info!(tables = self.plan.len(), "starting full warehouse load");

        self.ensure_schema().await?;

        let mut report = LoadReport::new();
        for table in self.plan.tables() {
            report.push(self.load_table(table).await);
        }

        let failed = report.failed().count();
        if failed > 0 {
            warn!(
                tables = report.len(),
                failed,
                rows_loaded = report.rows_loaded(),
                "warehouse load completed with failures"
            );
        } else {
            info!(
                tables = report.len(),
                rows_loaded = report.rows_loaded(),
                "warehouse load completed"
            );
        }

        Ok(report)
    }

    /// Loads only the table owning the artifact `key`, named by the key's first path segment.
    ///
    /// The warehouse tables are ensured first. A key without a `/` yields a failed result.
    pub async fn load_from_artifact_event(&self, key: &str) -> EtlResult<LoadResult> {
        info!(key, "processing artifact event");

        let Some((table, _)) = key.split_once('/') else {
            let err = etl_error!(
                ErrorKind::InvalidData,
                "Artifact key has no table prefix",
                format!("Key {key} does not contain a '/' separator")
            );
            error!(key, error = %err.message(), "artifact event rejected");
            return Ok(LoadResult::failed(key, None, &err));
        };

        self.ensure_schema().await?;

        Ok(self.load_table(table).await)
    }
}

fn record_table_load(result: &LoadResult, started: Instant) {
    let status = if result.is_success() { "success" } else { "failed" };

    counter!(
        LOADER_TABLE_LOADS_TOTAL,
        TABLE_NAME_LABEL => result.table.clone(),
        STATUS_LABEL => status,
    )
    .increment(1);

    if let (Some(rows), Some(operation)) = (result.rows_loaded, result.operation) {
        let operation = match operation {
            LoadOperation::Upsert => "upsert",
            LoadOperation::Insert => "insert",
        };
        counter!(
            LOADER_ROWS_LOADED_TOTAL,
            TABLE_NAME_LABEL => result.table.clone(),
            OPERATION_LABEL => operation,
        )
        .increment(rows);
    }

    histogram!(
        LOADER_TABLE_LOAD_DURATION_SECONDS,
        TABLE_NAME_LABEL => result.table.clone(),
    )
    .record(started.elapsed().as_secs_f64());
}
