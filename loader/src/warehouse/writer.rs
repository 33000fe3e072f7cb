use std::sync::Arc;

use pg_escape::quote_identifier;
use postgres::schema::TableName;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::{LoadOperation, TabularValue};
use crate::warehouse::WarehouseClient;

/// Builds `INSERT ... ON CONFLICT (<first column>) DO UPDATE SET ...` for `columns`.
///
/// The first column is the conflict key. When it is the only column the statement becomes
/// `DO NOTHING`.
pub fn upsert_statement(table: &TableName, columns: &[String]) -> String {
    let insert = insert_statement(table, columns);
    let Some((key, rest)) = columns.split_first() else {
        return insert;
    };

    if rest.is_empty() {
        return format!("{insert} ON CONFLICT ({}) DO NOTHING", quote_identifier(key));
    }

    let assignments = rest
        .iter()
        .map(|column| {
            let column = quote_identifier(column);
            format!("{column} = EXCLUDED.{column}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{insert} ON CONFLICT ({}) DO UPDATE SET {assignments}",
        quote_identifier(key)
    )
}

/// Builds a plain `INSERT` of exactly `columns` with positional placeholders.
pub fn insert_statement(table: &TableName, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|column| quote_identifier(column).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|position| format!("${position}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
        table.as_quoted_identifier()
    )
}

/// Writes coerced rows to warehouse tables, one transaction per call.
#[derive(Debug)]
pub struct WarehouseWriter<C> {
    client: Arc<C>,
    namespace: String,
    write_chunk_size: usize,
}

impl<C> WarehouseWriter<C>
where
    C: WarehouseClient,
{
    pub fn new(client: Arc<C>, namespace: impl Into<String>, write_chunk_size: usize) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            write_chunk_size: write_chunk_size.max(1),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Upserts every row keyed on the first column. Returns the number of rows written.
    pub async fn merge_upsert(&self, table: &str, data: &TabularValue) -> EtlResult<u64> {
        let table_name = TableName::new(self.namespace.as_str(), table);
        let statement = upsert_statement(&table_name, data.columns());

        self.write_rows(&table_name, LoadOperation::Upsert, &statement, data)
            .await
    }

    /// Appends every row. Lineage columns not present in the data take their column defaults.
    pub async fn insert_with_lineage(&self, table: &str, data: &TabularValue) -> EtlResult<u64> {
        let table_name = TableName::new(self.namespace.as_str(), table);
        let statement = insert_statement(&table_name, data.columns());

        self.write_rows(&table_name, LoadOperation::Insert, &statement, data)
            .await
    }

    async fn write_rows(
        &self,
        table_name: &TableName,
        operation: LoadOperation,
        statement: &str,
        data: &TabularValue,
    ) -> EtlResult<u64> {
        if data.is_empty() {
            debug!(table = %table_name, ?operation, "no rows to write");
            return Ok(0);
        }

        let total = data.num_rows();
        info!(table = %table_name, ?operation, rows = total, "writing rows");

        let result = async {
            self.client.batch_execute("BEGIN").await?;

            for (index, row) in data.rows().iter().enumerate() {
                if let Err(err) = self.client.execute(statement, row.values()).await {
                    return Err(etl_error!(
                        ErrorKind::WriteFailure,
                        "Writing a row to the warehouse failed",
                        format!(
                            "{operation:?} into {table_name} failed at row {index}: {}",
                            err.message()
                        ),
                        source: err
                    ));
                }

                let written = index + 1;
                if written % self.write_chunk_size == 0 && written < total {
                    debug!(table = %table_name, written, total, "write progress");
                }
            }

            self.client.batch_execute("COMMIT").await
        }
        .await;

        match result {
            Ok(()) => {
                info!(table = %table_name, ?operation, rows = total, "rows committed");
                Ok(total as u64)
            }
            Err(err) => {
                if let Err(rollback_err) = self.client.batch_execute("ROLLBACK").await {
                    warn!(
                        table = %table_name,
                        error = %rollback_err.message(),
                        "rollback after failed write also failed"
                    );
                }

                if err.kind() == ErrorKind::WriteFailure {
                    return Err(err);
                }

                Err(etl_error!(
                    ErrorKind::WriteFailure,
                    "Warehouse transaction failed",
                    format!("{operation:?} into {table_name}: {}", err.message()),
                    source: err
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::client::RecordingClient;
    use crate::types::Cell;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn upsert_updates_every_non_key_column() {
        let statement = upsert_statement(
            &TableName::new("public", "dim_currency"),
            &columns(&["currency_id", "currency_code", "currency_name"]),
        );

        assert_eq!(
            statement,
            "INSERT INTO public.dim_currency (currency_id, currency_code, currency_name) \
             VALUES ($1, $2, $3) ON CONFLICT (currency_id) DO UPDATE SET \
             currency_code = EXCLUDED.currency_code, currency_name = EXCLUDED.currency_name"
        );
    }

    #[test]
    fn upsert_with_only_the_key_does_nothing_on_conflict() {
        let statement = upsert_statement(
            &TableName::new("public", "dim_date"),
            &columns(&["date_id"]),
        );

        assert_eq!(
            statement,
            "INSERT INTO public.dim_date (date_id) VALUES ($1) ON CONFLICT (date_id) DO NOTHING"
        );
    }

    #[test]
    fn insert_quotes_identifiers() {
        let statement = insert_statement(
            &TableName::new("Sales", "fact_payment"),
            &columns(&["payment_id", "Amount"]),
        );

        assert_eq!(
            statement,
            "INSERT INTO \"Sales\".fact_payment (payment_id, \"Amount\") VALUES ($1, $2)"
        );
    }

    fn currency_data() -> TabularValue {
        use crate::types::TableRow;

        TabularValue::new(
            columns(&["currency_id", "currency_code"]),
            vec![
                TableRow::new(vec![Cell::I64(1), Cell::String("GBP".into())]),
                TableRow::new(vec![Cell::I64(2), Cell::String("USD".into())]),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_data_issues_no_statements() {
        let client = Arc::new(RecordingClient::new());
        let writer = WarehouseWriter::new(client.clone(), "public", 10);

        let written = writer
            .merge_upsert("dim_currency", &TabularValue::with_columns(columns(&["currency_id"])))
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(client.statements().await.is_empty());
    }

    #[tokio::test]
    async fn rows_are_written_in_one_transaction() {
        let client = Arc::new(RecordingClient::new());
        let writer = WarehouseWriter::new(client.clone(), "public", 1);

        let written = writer
            .merge_upsert("dim_currency", &currency_data())
            .await
            .unwrap();

        assert_eq!(written, 2);
        let texts = client.statement_texts().await;
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], "BEGIN");
        assert_eq!(texts[3], "COMMIT");

        let writes = client.writes().await;
        assert_eq!(writes[1].params, vec![Cell::I64(2), Cell::String("USD".into())]);
    }

    #[tokio::test]
    async fn failed_row_rolls_back_and_reports_write_failure() {
        let client = Arc::new(RecordingClient::new());
        client.fail_statements_containing("fact_payment").await;
        let writer = WarehouseWriter::new(client.clone(), "public", 10);

        let err = writer
            .insert_with_lineage("fact_payment", &currency_data())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::WriteFailure);
        assert!(err.detail().unwrap().contains("failed at row 0"));
        let texts = client.statement_texts().await;
        assert_eq!(texts.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!texts.iter().any(|statement| statement == "COMMIT"));
    }

    #[tokio::test]
    async fn rollback_failure_keeps_the_original_error() {
        let client = Arc::new(RecordingClient::new());
        client.fail_statements_containing("dim_currency").await;
        client.fail_rollback().await;
        let writer = WarehouseWriter::new(client.clone(), "public", 10);

        let err = writer
            .merge_upsert("dim_currency", &currency_data())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::WriteFailure);
        assert_eq!(err.description(), "Writing a row to the warehouse failed");
    }
}
