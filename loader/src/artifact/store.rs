use std::sync::Arc;
use std::time::Duration;

use config::shared::ObjectStoreConfig;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ClientOptions, ObjectStore, RetryConfig};
use tracing::info;

use crate::error::EtlResult;

/// Builds the object store described by `config`.
///
/// S3 credentials are read from the standard `AWS_*` environment variables.
pub fn create_object_store(config: &ObjectStoreConfig) -> EtlResult<Arc<dyn ObjectStore>> {
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
            let client_options = ClientOptions::new()
                .with_connect_timeout(Duration::from_secs(*connect_timeout_secs))
                .with_timeout(Duration::from_secs(*request_timeout_secs))
                .with_allow_http(*allow_http);
            let retry_config = RetryConfig {
                max_retries: *max_retries,
                ..Default::default()
            };

            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_client_options(client_options)
                .with_retry(retry_config);
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder.with_endpoint(endpoint);
            }

            info!(bucket, "using s3 object store");
            Ok(Arc::new(builder.build()?))
        }
        ObjectStoreConfig::Local { root } => {
            info!(root = %root.display(), "using local filesystem object store");
            Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
        }
        ObjectStoreConfig::Memory => {
            info!("using in-memory object store");
            Ok(Arc::new(InMemory::new()))
        }
    }
}
