use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::shared::ValidationError;

const fn default_connect_timeout_secs() -> u64 {
    ObjectStoreConfig::DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_request_timeout_secs() -> u64 {
    ObjectStoreConfig::DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_retries() -> usize {
    ObjectStoreConfig::DEFAULT_MAX_RETRIES
}

/// Object storage holding the processed artifacts, one prefix per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// Amazon S3 or an S3-compatible service.
    ///
    /// Credentials are taken from the standard `AWS_*` environment variables.
    S3 {
        /// Bucket containing the processed artifacts.
        bucket: String,
        /// Region of the bucket, taken from the environment when absent.
        region: Option<String>,
        /// Custom endpoint for S3-compatible services.
        endpoint: Option<String>,
        /// Allows plain HTTP endpoints (local S3 emulators).
        #[serde(default)]
        allow_http: bool,
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: u64,
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
        #[serde(default = "default_max_retries")]
        max_retries: usize,
    },
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// An in-process store, empty at startup.
    Memory,
}

impl ObjectStoreConfig {
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let ObjectStoreConfig::S3 { bucket, .. } = self {
            if bucket.trim().is_empty() {
                return Err(ValidationError::EmptyBucket);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_defaults_are_applied() {
        let config: ObjectStoreConfig =
            serde_json::from_str(r#"{"s3": {"bucket": "processed", "region": "eu-west-2"}}"#)
                .unwrap();

        let ObjectStoreConfig::S3 {
            bucket,
            connect_timeout_secs,
            request_timeout_secs,
            max_retries,
            allow_http,
            ..
        } = config
        else {
            panic!("expected s3 config");
        };

        assert_eq!(bucket, "processed");
        assert_eq!(connect_timeout_secs, 5);
        assert_eq!(request_timeout_secs, 10);
        assert_eq!(max_retries, 2);
        assert!(!allow_http);
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let config: ObjectStoreConfig =
            serde_json::from_str(r#"{"s3": {"bucket": " "}}"#).unwrap();

        assert!(matches!(config.validate(), Err(ValidationError::EmptyBucket)));
    }

    #[test]
    fn memory_store_parses_from_unit_variant() {
        let config: ObjectStoreConfig = serde_json::from_str(r#""memory""#).unwrap();
        assert!(matches!(config, ObjectStoreConfig::Memory));
    }
}
