use serde::Deserialize;

use crate::Config;
use crate::shared::{
    LoaderConfig, ObjectStoreConfig, PgConnectionConfig, SecretError, TlsConfig, ValidationError,
    WarehouseSecret,
};

fn default_secret_tls() -> TlsConfig {
    TlsConfig::disabled()
}

/// Where warehouse credentials come from when they are not inlined in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseSecretSource {
    /// Environment variable holding the JSON secret document.
    pub env_var: String,
    #[serde(default = "default_secret_tls")]
    pub tls: TlsConfig,
}

/// Complete configuration for the `load-runner` binary.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRunnerConfig {
    /// Inline warehouse connection settings.
    pub warehouse: Option<PgConnectionConfig>,
    /// Secret document source, used when `warehouse` is absent.
    pub warehouse_secret: Option<WarehouseSecretSource>,
    /// Object storage holding the processed artifacts.
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl LoadRunnerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(warehouse) = &self.warehouse {
            warehouse.validate()?;
        }
        if let Some(source) = &self.warehouse_secret {
            source.tls.validate()?;
        }
        self.object_store.validate()?;
        self.loader.validate()
    }

    /// Resolves the warehouse connection, reading the secret document when needed.
    pub fn resolve_warehouse(&self) -> Result<PgConnectionConfig, SecretError> {
        if let Some(warehouse) = &self.warehouse {
            return Ok(warehouse.clone());
        }

        match &self.warehouse_secret {
            Some(source) => WarehouseSecret::from_env(&source.env_var)?
                .into_connection_config(source.tls.clone()),
            None => Err(SecretError::MissingValues(
                "warehouse or warehouse_secret".to_string(),
            )),
        }
    }
}

impl Config for LoadRunnerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["loader.tables"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_warehouse_takes_precedence() {
        let config: LoadRunnerConfig = serde_json::from_str(
            r#"{
                "warehouse": {
                    "host": "localhost", "port": 5432, "name": "dw", "username": "loader",
                    "tls": {"trusted_root_certs": "", "enabled": false}
                },
                "warehouse_secret": {"env_var": "LOADER_TEST_UNSET_SECRET"},
                "object_store": "memory"
            }"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_warehouse().unwrap().name, "dw");
        assert_eq!(config.loader.namespace, "public");
    }

    #[test]
    fn missing_secret_env_var_is_reported() {
        let config: LoadRunnerConfig = serde_json::from_str(
            r#"{
                "warehouse_secret": {"env_var": "LOADER_TEST_DEFINITELY_UNSET"},
                "object_store": {"s3": {"bucket": "processed"}}
            }"#,
        )
        .unwrap();

        let err = config.resolve_warehouse().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required env var: LOADER_TEST_DEFINITELY_UNSET"
        );
    }

    #[test]
    fn no_credentials_source_is_reported() {
        let config: LoadRunnerConfig =
            serde_json::from_str(r#"{"object_store": "memory"}"#).unwrap();

        assert!(matches!(
            config.resolve_warehouse(),
            Err(SecretError::MissingValues(_))
        ));
    }
}
