use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tokio_postgres::{Config as TokioPgConnectOptions, config::SslMode as TokioPgSslMode};

use crate::shared::ValidationError;

const fn default_connect_timeout_secs() -> u64 {
    PgConnectionConfig::DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Session settings applied to every warehouse connection opened by the loader.
pub static LOADER_CONNECTION_OPTIONS: LazyLock<PgConnectionOptions> =
    LazyLock::new(|| PgConnectionOptions {
        datestyle: "ISO".to_string(),
        client_encoding: "UTF8".to_string(),
        timezone: "UTC".to_string(),
        statement_timeout: 300_000,
        lock_timeout: 30_000,
        idle_in_transaction_session_timeout: 60_000,
        application_name: "warehouse_loader".to_string(),
    });

/// Postgres session settings passed through the startup `options` parameter.
#[derive(Debug, Clone)]
pub struct PgConnectionOptions {
    pub datestyle: String,
    pub client_encoding: String,
    pub timezone: String,
    pub statement_timeout: u32,
    pub lock_timeout: u32,
    pub idle_in_transaction_session_timeout: u32,
    pub application_name: String,
}

impl PgConnectionOptions {
    pub fn to_options_string(&self) -> String {
        format!(
            "-c datestyle={} -c client_encoding={} -c timezone={} -c statement_timeout={} -c lock_timeout={} -c idle_in_transaction_session_timeout={}",
            self.datestyle,
            self.client_encoding,
            self.timezone,
            self.statement_timeout,
            self.lock_timeout,
            self.idle_in_transaction_session_timeout,
        )
    }
}

/// Connection settings for the warehouse database.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking the password into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    pub tls: TlsConfig,
    /// Seconds to wait for the TCP/TLS handshake before giving up.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl PgConnectionConfig {
    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::MissingWarehouseValue("host"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingWarehouseValue("name"));
        }
        if self.username.is_empty() {
            return Err(ValidationError::MissingWarehouseValue("username"));
        }

        self.tls.validate()
    }
}

/// Same as [`PgConnectionConfig`] but without the password, safe to log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgConnectionConfigWithoutSecrets {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub tls_enabled: bool,
}

impl From<&PgConnectionConfig> for PgConnectionConfigWithoutSecrets {
    fn from(value: &PgConnectionConfig) -> Self {
        PgConnectionConfigWithoutSecrets {
            host: value.host.clone(),
            port: value.port,
            name: value.name.clone(),
            username: value.username.clone(),
            tls_enabled: value.tls.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: "".to_string(),
            enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

pub trait IntoConnectOptions<Output> {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> Output;
    fn with_db(&self, options: Option<&PgConnectionOptions>) -> Output;
}

impl IntoConnectOptions<TokioPgConnectOptions> for PgConnectionConfig {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> TokioPgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            TokioPgSslMode::Require
        } else {
            TokioPgSslMode::Prefer
        };
        let mut config = TokioPgConnectOptions::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .ssl_mode(ssl_mode)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));

        if let Some(password) = &self.password {
            config.password(password.expose_secret());
        }

        if let Some(opts) = options {
            config
                .options(&opts.to_options_string())
                .application_name(&opts.application_name);
        }

        config
    }

    fn with_db(&self, options: Option<&PgConnectionOptions>) -> TokioPgConnectOptions {
        let mut config: TokioPgConnectOptions = self.without_db(options);
        config.dbname(&self.name);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection_config(tls: TlsConfig) -> PgConnectionConfig {
        PgConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            name: "warehouse".to_string(),
            username: "loader".to_string(),
            password: Some(SecretString::new("secret".to_string())),
            tls,
            connect_timeout_secs: 5,
        }
    }

    #[test]
    fn loader_options_string_format() {
        assert_eq!(
            LOADER_CONNECTION_OPTIONS.to_options_string(),
            "-c datestyle=ISO -c client_encoding=UTF8 -c timezone=UTC -c statement_timeout=300000 -c lock_timeout=30000 -c idle_in_transaction_session_timeout=60000"
        );
    }

    #[test]
    fn tls_without_certificates_is_rejected() {
        let config = connection_config(TlsConfig {
            trusted_root_certs: String::new(),
            enabled: true,
        });

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        ));
    }

    #[test]
    fn tokio_options_carry_database_and_timeout() {
        let config = connection_config(TlsConfig::disabled());
        let options: TokioPgConnectOptions = config.with_db(Some(&LOADER_CONNECTION_OPTIONS));

        assert_eq!(options.get_dbname(), Some("warehouse"));
        assert_eq!(options.get_user(), Some("loader"));
        assert_eq!(options.get_connect_timeout(), Some(&Duration::from_secs(5)));
        assert_eq!(options.get_application_name(), Some("warehouse_loader"));
    }

    #[test]
    fn without_secrets_drops_password() {
        let config = connection_config(TlsConfig::disabled());
        let redacted = PgConnectionConfigWithoutSecrets::from(&config);
        let rendered = serde_json::to_string(&redacted).unwrap();

        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("\"tls_enabled\":false"));
    }
}
