use std::io::BufReader;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use config::shared::{IntoConnectOptions, LOADER_CONNECTION_OPTIONS, PgConnectionConfig};
use rustls::ClientConfig;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config, Connection, NoTls, Row, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, info};
use uuid::Uuid;

use crate::conversions::numeric::PgNumeric;
use crate::error::EtlResult;
use crate::types::{Cell, TableRow};
use crate::warehouse::WarehouseClient;

/// Spawns a background task that drives a Postgres connection until it terminates.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let task = async move {
        match connection.await {
            Err(err) => error!("an error occurred during the postgres connection: {}", err),
            Ok(()) => info!("postgres connection terminated successfully"),
        }
    };

    // The connection ends when the `Client` is dropped, so the handle is not kept.
    tokio::spawn(task);
}

/// [`WarehouseClient`] backed by a single `tokio-postgres` session.
#[derive(Debug)]
pub struct PostgresClient {
    client: Client,
}

impl PostgresClient {
    /// Connects to the warehouse, using TLS when enabled in the configuration.
    pub async fn connect(pg_connection_config: &PgConnectionConfig) -> EtlResult<Self> {
        match pg_connection_config.tls.enabled {
            true => PostgresClient::connect_tls(pg_connection_config).await,
            false => PostgresClient::connect_no_tls(pg_connection_config).await,
        }
    }

    async fn connect_no_tls(pg_connection_config: &PgConnectionConfig) -> EtlResult<Self> {
        let config: Config = pg_connection_config.with_db(Some(&*LOADER_CONNECTION_OPTIONS));

        let (client, connection) = config.connect(NoTls).await?;
        spawn_postgres_connection::<NoTls>(connection);

        info!(
            host = %pg_connection_config.host,
            database = %pg_connection_config.name,
            "connected to warehouse without tls"
        );

        Ok(PostgresClient { client })
    }

    async fn connect_tls(pg_connection_config: &PgConnectionConfig) -> EtlResult<Self> {
        let config: Config = pg_connection_config.with_db(Some(&*LOADER_CONNECTION_OPTIONS));

        let mut root_store = rustls::RootCertStore::empty();
        let mut root_certs_reader =
            BufReader::new(pg_connection_config.tls.trusted_root_certs.as_bytes());
        for cert in rustls_pemfile::certs(&mut root_certs_reader) {
            let cert = cert?;
            root_store.add(cert)?;
        }

        let tls_config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
                .with_safe_default_protocol_versions()?
                .with_root_certificates(root_store)
                .with_no_client_auth();

        let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;
        spawn_postgres_connection::<MakeRustlsConnect>(connection);

        info!(
            host = %pg_connection_config.host,
            database = %pg_connection_config.name,
            "connected to warehouse with tls"
        );

        Ok(PostgresClient { client })
    }

    /// Checks if the underlying connection is closed.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

fn as_params(params: &[Cell]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|cell| cell as &(dyn ToSql + Sync)).collect()
}

/// Converts a result row to a [`TableRow`] using each column's Postgres type.
fn row_to_table_row(row: &Row) -> EtlResult<TableRow> {
    let mut cells = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let cell = match *column.type_() {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Cell::Bool),
            Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Cell::I16),
            Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Cell::I32),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Cell::I64),
            Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(Cell::U32),
            Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(Cell::F32),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Cell::F64),
            Type::NUMERIC => row.try_get::<_, Option<PgNumeric>>(idx)?.map(Cell::Numeric),
            Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(Cell::Date),
            Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.map(Cell::Time),
            Type::TIMESTAMP => row
                .try_get::<_, Option<NaiveDateTime>>(idx)?
                .map(Cell::Timestamp),
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)?
                .map(Cell::TimestampTz),
            Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Cell::Uuid),
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<serde_json::Value>>(idx)?
                .map(Cell::Json),
            Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Cell::Bytes),
            _ => row.try_get::<_, Option<String>>(idx)?.map(Cell::String),
        };

        cells.push(cell.unwrap_or(Cell::Null));
    }

    Ok(TableRow::new(cells))
}

impl WarehouseClient for PostgresClient {
    async fn execute(&self, statement: &str, params: &[Cell]) -> EtlResult<u64> {
        let params = as_params(params);
        let affected = self.client.execute(statement, &params).await?;

        Ok(affected)
    }

    async fn batch_execute(&self, statements: &str) -> EtlResult<()> {
        self.client.batch_execute(statements).await?;

        Ok(())
    }

    async fn query(&self, statement: &str, params: &[Cell]) -> EtlResult<Vec<TableRow>> {
        let params = as_params(params);
        let rows = self.client.query(statement, &params).await?;

        rows.iter().map(row_to_table_row).collect()
    }
}
