use postgres::model::DIMENSIONAL_MODEL;
use postgres::schema::{ColumnSchema, TABLE_COLUMNS_QUERY, TableSchema};
use tracing::{debug, info};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::Cell;
use crate::warehouse::WarehouseClient;

/// Reads the column contracts of `namespace.table` from `information_schema.columns`.
///
/// An unknown table yields an empty schema.
pub async fn read_schema<C: WarehouseClient>(
    client: &C,
    namespace: &str,
    table: &str,
) -> EtlResult<TableSchema> {
    let rows = client
        .query(
            TABLE_COLUMNS_QUERY,
            &[Cell::from(namespace), Cell::from(table)],
        )
        .await?;

    let mut column_schemas = Vec::with_capacity(rows.len());
    for row in rows {
        let [name, data_type, is_nullable] = <[Cell; 3]>::try_from(row.into_values())
            .map_err(|values| {
                crate::etl_error!(
                    ErrorKind::InvalidData,
                    "Unexpected catalog row shape",
                    format!("Expected 3 catalog values, got {}", values.len())
                )
            })?;

        match (name, data_type, is_nullable) {
            (Cell::String(name), Cell::String(data_type), Cell::String(is_nullable)) => {
                column_schemas.push(ColumnSchema::from_catalog(name, data_type, &is_nullable));
            }
            other => bail!(
                ErrorKind::InvalidData,
                "Unexpected catalog row values",
                format!("{other:?}")
            ),
        }
    }

    debug!(namespace, table, columns = column_schemas.len(), "read table schema");

    Ok(TableSchema::new(column_schemas))
}

/// Creates every table of the dimensional model in `namespace` if it does not exist yet.
///
/// Tables are created in load order so foreign key targets exist before the tables that
/// reference them.
pub async fn ensure_dimensional_model<C: WarehouseClient>(
    client: &C,
    namespace: &str,
) -> EtlResult<()> {
    for table in DIMENSIONAL_MODEL {
        client
            .batch_execute(&table.create_statement(namespace))
            .await?;
    }

    info!(
        namespace,
        tables = DIMENSIONAL_MODEL.len(),
        "dimensional model tables ensured"
    );

    Ok(())
}
