use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::shared::{PgConnectionConfig, TlsConfig};

const DEFAULT_WAREHOUSE_PORT: u16 = 5432;

/// Errors raised while resolving warehouse credentials from a secret document.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The environment variable holding the secret document is not set.
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    /// The secret document is not valid JSON.
    #[error("warehouse secret is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The secret document lacks one or more required values.
    #[error("warehouse secret is missing required values: {0}")]
    MissingValues(String),
}

/// Warehouse credentials as stored in a secret manager.
///
/// Accepts either `user` or `username` for the login name.
#[derive(Deserialize)]
pub struct WarehouseSecret {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
}

impl WarehouseSecret {
    /// Reads and parses the secret document stored in the environment variable `env_var`.
    pub fn from_env(env_var: &str) -> Result<WarehouseSecret, SecretError> {
        let raw = std::env::var(env_var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SecretError::MissingEnvVar(env_var.to_string()))?;

        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<WarehouseSecret, SecretError> {
        serde_json::from_str(raw).map_err(SecretError::Malformed)
    }

    /// Builds a connection config, failing when any required value is absent or empty.
    pub fn into_connection_config(self, tls: TlsConfig) -> Result<PgConnectionConfig, SecretError> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let host = non_empty(self.host);
        let database = non_empty(self.database);
        let user = non_empty(self.user).or_else(|| non_empty(self.username));
        let password = self.password;

        let mut missing = Vec::new();
        if host.is_none() {
            missing.push("host");
        }
        if database.is_none() {
            missing.push("database");
        }
        if user.is_none() {
            missing.push("user/username");
        }
        if password.is_none() {
            missing.push("password");
        }

        match (host, database, user, password) {
            (Some(host), Some(name), Some(username), Some(password)) => Ok(PgConnectionConfig {
                host,
                port: self.port.unwrap_or(DEFAULT_WAREHOUSE_PORT),
                name,
                username,
                password: Some(password),
                tls,
                connect_timeout_secs: PgConnectionConfig::DEFAULT_CONNECT_TIMEOUT_SECS,
            }),
            _ => Err(SecretError::MissingValues(missing.join(", "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn accepts_username_key_and_default_port() {
        let secret = WarehouseSecret::parse(
            r#"{"host": "db", "database": "dw", "username": "loader", "password": "pw"}"#,
        )
        .unwrap();
        let config = secret.into_connection_config(TlsConfig::disabled()).unwrap();

        assert_eq!(config.host, "db");
        assert_eq!(config.port, 5432);
        assert_eq!(config.name, "dw");
        assert_eq!(config.username, "loader");
        assert_eq!(config.password.unwrap().expose_secret(), "pw");
    }

    #[test]
    fn prefers_user_key_over_username() {
        let secret = WarehouseSecret::parse(
            r#"{"host": "db", "port": 6543, "database": "dw", "user": "a", "username": "b", "password": "pw"}"#,
        )
        .unwrap();
        let config = secret.into_connection_config(TlsConfig::disabled()).unwrap();

        assert_eq!(config.username, "a");
        assert_eq!(config.port, 6543);
    }

    #[test]
    fn lists_every_missing_value() {
        let secret = WarehouseSecret::parse(r#"{"host": "db", "database": ""}"#).unwrap();
        let err = secret
            .into_connection_config(TlsConfig::disabled())
            .err()
            .unwrap();

        assert_eq!(
            err.to_string(),
            "warehouse secret is missing required values: database, user/username, password"
        );
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(matches!(
            WarehouseSecret::parse("not json"),
            Err(SecretError::Malformed(_))
        ));
    }
}
