use std::sync::Arc;

use config::shared::{LoadRunnerConfig, LoaderConfig, ObjectStoreConfig, PgConnectionConfig};
use loader::artifact::{ArtifactLocator, create_object_store};
use loader::orchestrator::LoadOrchestrator;
use loader::warehouse::{PostgresClient, WarehouseClient};
use tracing::{debug, info};

use crate::error::{LoadRunnerError, LoadRunnerResult};
use crate::event::Invocation;
use crate::response::LoadOutcome;

/// Connects to object storage and the warehouse, then runs `invocation`.
pub async fn start_load_with_config(
    config: LoadRunnerConfig,
    invocation: Invocation,
) -> LoadRunnerResult<LoadOutcome> {
    info!(?invocation, "starting warehouse load");

    log_config(&config);

    let warehouse = config
        .resolve_warehouse()
        .map_err(LoadRunnerError::config)?;
    log_pg_connection_config(&warehouse);

    let store = create_object_store(&config.object_store)?;
    let client = PostgresClient::connect(&warehouse).await?;

    let orchestrator =
        LoadOrchestrator::new(ArtifactLocator::new(store), Arc::new(client), &config.loader)?;

    run_invocation(&orchestrator, invocation).await
}

/// Runs a full load or a single-artifact load with an already built orchestrator.
pub async fn run_invocation<C>(
    orchestrator: &LoadOrchestrator<C>,
    invocation: Invocation,
) -> LoadRunnerResult<LoadOutcome>
where
    C: WarehouseClient,
{
    let outcome = match invocation {
        Invocation::FullLoad => LoadOutcome::Full(orchestrator.load_all().await?),
        Invocation::Artifact { key } => {
            LoadOutcome::Artifact(orchestrator.load_from_artifact_event(&key).await?)
        }
    };

    Ok(outcome)
}

fn log_config(config: &LoadRunnerConfig) {
    log_object_store_config(&config.object_store);
    log_loader_config(&config.loader);
}

fn log_object_store_config(config: &ObjectStoreConfig) {
    match config {
        ObjectStoreConfig::S3 {
            bucket,
            region,
            endpoint,
            allow_http,
            connect_timeout_secs,
            request_timeout_secs,
            max_retries,
        } => {
            debug!(
                bucket,
                region = region.as_deref(),
                endpoint = endpoint.as_deref(),
                allow_http,
                connect_timeout_secs,
                request_timeout_secs,
                max_retries,
                "using s3 object store config"
            )
        }
        ObjectStoreConfig::Local { root } => {
            debug!(root = %root.display(), "using local object store config");
        }
        ObjectStoreConfig::Memory => {
            debug!("using memory object store config");
        }
    }
}

fn log_loader_config(config: &LoaderConfig) {
    debug!(
        namespace = config.namespace,
        text_default = config.text_default,
        write_chunk_size = config.write_chunk_size,
        tables = ?config.tables,
        "loader config"
    );
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "warehouse connection config",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader::test_utils::artifact::{memory_store, put_json_lines};
    use loader::test_utils::client::RecordingClient;
    use serde_json::json;

    #[tokio::test]
    async fn artifact_invocation_yields_a_single_result() {
        let store = memory_store();
        put_json_lines(
            store.as_ref(),
            "dim_currency/batch1.jsonl",
            &[json!({"currency_id": 1, "currency_code": "EUR", "currency_name": "Euro"})],
        )
        .await
        .unwrap();
        let client = RecordingClient::new();
        let orchestrator = LoadOrchestrator::new(
            ArtifactLocator::new(store),
            Arc::new(client.clone()),
            &LoaderConfig::default(),
        )
        .unwrap();

        let outcome = run_invocation(
            &orchestrator,
            Invocation::Artifact {
                key: "dim_currency/batch1.jsonl".to_owned(),
            },
        )
        .await
        .unwrap();

        let LoadOutcome::Artifact(result) = outcome else {
            panic!("expected a single result");
        };
        assert!(result.is_success());
        assert_eq!(client.writes().await.len(), 1);
    }

    #[tokio::test]
    async fn failing_table_creation_is_a_setup_error() {
        let client = RecordingClient::new();
        client.fail_statements_containing("CREATE TABLE").await;
        let orchestrator = LoadOrchestrator::new(
            ArtifactLocator::new(memory_store()),
            Arc::new(client),
            &LoaderConfig::default(),
        )
        .unwrap();

        let err = run_invocation(&orchestrator, Invocation::FullLoad)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadRunnerError::Etl(_)));
        assert_eq!(err.category(), "load error");
    }
}
