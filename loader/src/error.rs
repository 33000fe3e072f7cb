//! Error types and result definitions for load operations.
//!
//! Provides an error system with classification and captured diagnostic metadata. An
//! [`EtlError`] carries an [`ErrorKind`], a static description, optional dynamic detail, an
//! optional source error, the callsite location and a backtrace.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for load operations using [`EtlError`] as the error type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Detailed payload stored for every [`EtlError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for load operations.
#[derive(Debug, Clone)]
pub struct EtlError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur while loading the warehouse.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection Errors
    WarehouseConnectionFailed,

    // Query & Execution Errors
    WarehouseQueryFailed,
    WarehouseLockTimeout,
    WarehouseOperationCanceled,

    // Load Pipeline Errors
    ArtifactNotFound,
    SchemaUnavailable,
    WriteFailure,
    UnknownTableKind,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,
    ValidationError,

    // Configuration Errors
    ConfigError,

    // IO & Decoding Errors
    IoError,
    StorageError,
    DeserializationError,

    // Security & Authentication Errors
    EncryptionError,
    AuthenticationError,
    PermissionDenied,

    // State Errors
    InvalidState,
}

impl EtlError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the description followed by the detail, without location or backtrace.
    ///
    /// This is the form reported back to callers in load results.
    pub fn message(&self) -> String {
        match self.detail() {
            Some(detail) if !detail.trim().is_empty() => {
                format!("{}: {detail}", self.payload.description)
            }
            _ => self.payload.description.to_string(),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates an [`EtlError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }

    /// Creates an [`EtlError`] from any error, keeping its rendering as detail.
    #[track_caller]
    fn from_source<E>(kind: ErrorKind, description: &'static str, err: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl Hash for EtlError {
    /// Hashes the error using only its kind and static description.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.kind.hash(state);
        self.payload.description.hash(state);
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let payload = &self.payload;
        let location = payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            payload.kind,
            payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        write_detail(payload.detail.as_deref(), f, 1)?;
        write_backtrace(payload.backtrace.as_ref(), f, 1)?;

        Ok(())
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty()
        && !rendered_backtrace.contains("disabled backtrace")
    {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        EtlError::from_source(ErrorKind::IoError, "I/O operation failed", err)
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`] with the appropriate error kind.
impl From<serde_json::Error> for EtlError {
    #[track_caller]
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        EtlError::from_source(kind, description, err)
    }
}

/// Converts [`bigdecimal::ParseBigDecimalError`] to [`EtlError`] with [`ErrorKind::ConversionError`].
impl From<bigdecimal::ParseBigDecimalError> for EtlError {
    #[track_caller]
    fn from(err: bigdecimal::ParseBigDecimalError) -> EtlError {
        EtlError::from_source(ErrorKind::ConversionError, "Numeric parsing failed", err)
    }
}

/// Converts [`object_store::Error`] to [`EtlError`].
///
/// Missing objects map to [`ErrorKind::ArtifactNotFound`], everything else to
/// [`ErrorKind::StorageError`].
impl From<object_store::Error> for EtlError {
    #[track_caller]
    fn from(err: object_store::Error) -> EtlError {
        let (kind, description) = match &err {
            object_store::Error::NotFound { .. } => {
                (ErrorKind::ArtifactNotFound, "Artifact not found in object store")
            }
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => (
                ErrorKind::PermissionDenied,
                "Object store access denied",
            ),
            _ => (ErrorKind::StorageError, "Object store operation failed"),
        };

        EtlError::from_source(kind, description, err)
    }
}

/// Converts [`parquet::errors::ParquetError`] to [`EtlError`] with [`ErrorKind::DeserializationError`].
impl From<parquet::errors::ParquetError> for EtlError {
    #[track_caller]
    fn from(err: parquet::errors::ParquetError) -> EtlError {
        EtlError::from_source(
            ErrorKind::DeserializationError,
            "Parquet decoding failed",
            err,
        )
    }
}

/// Converts [`arrow::error::ArrowError`] to [`EtlError`] with [`ErrorKind::DeserializationError`].
impl From<arrow::error::ArrowError> for EtlError {
    #[track_caller]
    fn from(err: arrow::error::ArrowError) -> EtlError {
        EtlError::from_source(
            ErrorKind::DeserializationError,
            "Arrow decoding failed",
            err,
        )
    }
}

/// Converts [`tokio_postgres::Error`] to [`EtlError`] with the appropriate error kind.
///
/// Maps errors based on Postgres SQLSTATE codes.
impl From<tokio_postgres::Error> for EtlError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> EtlError {
        let (kind, description) = match err.code() {
            Some(sqlstate) => {
                use tokio_postgres::error::SqlState;
                match *sqlstate {
                    // Connection errors (08xxx)
                    SqlState::CONNECTION_EXCEPTION
                    | SqlState::CONNECTION_DOES_NOT_EXIST
                    | SqlState::CONNECTION_FAILURE
                    | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                    | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION => (
                        ErrorKind::WarehouseConnectionFailed,
                        "PostgreSQL connection failed",
                    ),
                    // Authentication errors (28xxx)
                    SqlState::INVALID_AUTHORIZATION_SPECIFICATION | SqlState::INVALID_PASSWORD => (
                        ErrorKind::AuthenticationError,
                        "PostgreSQL authentication failed",
                    ),
                    // Data integrity violations (23xxx)
                    SqlState::INTEGRITY_CONSTRAINT_VIOLATION
                    | SqlState::NOT_NULL_VIOLATION
                    | SqlState::FOREIGN_KEY_VIOLATION
                    | SqlState::UNIQUE_VIOLATION
                    | SqlState::CHECK_VIOLATION => (
                        ErrorKind::ValidationError,
                        "PostgreSQL constraint violation",
                    ),
                    // Data conversion errors (22xxx)
                    SqlState::DATA_EXCEPTION
                    | SqlState::INVALID_TEXT_REPRESENTATION
                    | SqlState::INVALID_DATETIME_FORMAT
                    | SqlState::DATETIME_FIELD_OVERFLOW
                    | SqlState::NUMERIC_VALUE_OUT_OF_RANGE
                    | SqlState::STRING_DATA_RIGHT_TRUNCATION => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),
                    // Schema/object not found errors (42xxx)
                    SqlState::UNDEFINED_TABLE
                    | SqlState::UNDEFINED_COLUMN
                    | SqlState::UNDEFINED_SCHEMA => (
                        ErrorKind::WarehouseQueryFailed,
                        "PostgreSQL schema object not found",
                    ),
                    // Syntax and access errors (42xxx)
                    SqlState::SYNTAX_ERROR | SqlState::SYNTAX_ERROR_OR_ACCESS_RULE_VIOLATION => (
                        ErrorKind::WarehouseQueryFailed,
                        "PostgreSQL syntax error",
                    ),
                    SqlState::INSUFFICIENT_PRIVILEGE => (
                        ErrorKind::PermissionDenied,
                        "PostgreSQL permission denied",
                    ),
                    // Resource errors (53xxx)
                    SqlState::INSUFFICIENT_RESOURCES
                    | SqlState::OUT_OF_MEMORY
                    | SqlState::TOO_MANY_CONNECTIONS
                    | SqlState::DISK_FULL => (
                        ErrorKind::WarehouseConnectionFailed,
                        "PostgreSQL resource limitation",
                    ),
                    // Transaction errors (40xxx, 25xxx)
                    SqlState::TRANSACTION_ROLLBACK
                    | SqlState::T_R_SERIALIZATION_FAILURE
                    | SqlState::T_R_DEADLOCK_DETECTED
                    | SqlState::INVALID_TRANSACTION_STATE
                    | SqlState::ACTIVE_SQL_TRANSACTION
                    | SqlState::NO_ACTIVE_SQL_TRANSACTION
                    | SqlState::IN_FAILED_SQL_TRANSACTION => {
                        (ErrorKind::InvalidState, "PostgreSQL transaction failed")
                    }
                    // Operator intervention errors (57xxx)
                    SqlState::QUERY_CANCELED | SqlState::OPERATOR_INTERVENTION => (
                        ErrorKind::WarehouseOperationCanceled,
                        "PostgreSQL query canceled",
                    ),
                    SqlState::ADMIN_SHUTDOWN
                    | SqlState::CRASH_SHUTDOWN
                    | SqlState::CANNOT_CONNECT_NOW => (
                        ErrorKind::WarehouseConnectionFailed,
                        "PostgreSQL server unavailable",
                    ),
                    SqlState::LOCK_NOT_AVAILABLE => (
                        ErrorKind::WarehouseLockTimeout,
                        "PostgreSQL lock not available",
                    ),
                    // Default for other SQL states
                    _ => (ErrorKind::WarehouseQueryFailed, "PostgreSQL error"),
                }
            }
            // No SQL state means connection issue
            None => (
                ErrorKind::WarehouseConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        EtlError::from_source(kind, description, err)
    }
}

/// Converts [`rustls::Error`] to [`EtlError`] with [`ErrorKind::EncryptionError`].
impl From<rustls::Error> for EtlError {
    #[track_caller]
    fn from(err: rustls::Error) -> EtlError {
        EtlError::from_source(ErrorKind::EncryptionError, "TLS configuration failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, etl_error};
    use std::error::Error;

    fn failing() -> EtlResult<()> {
        bail!(
            ErrorKind::UnknownTableKind,
            "Unknown table type",
            "dim_weather"
        );
    }

    #[test]
    fn message_joins_description_and_detail() {
        let err = failing().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnknownTableKind);
        assert_eq!(err.message(), "Unknown table type: dim_weather");
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn message_without_detail_is_description() {
        let err = etl_error!(ErrorKind::InvalidData, "Row width mismatch");

        assert_eq!(err.message(), "Row width mismatch");
        assert!(err.detail().is_none());
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::other("disk on fire");
        let err = etl_error!(ErrorKind::WriteFailure, "Write failed", source: io);

        assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn display_includes_kind_and_detail() {
        let err: EtlError = std::io::Error::other("boom").into();
        let rendered = err.to_string();

        assert!(rendered.starts_with("[IoError] I/O operation failed @ "));
        assert!(rendered.contains("Detail:\n    boom"));
    }

    #[test]
    fn object_store_not_found_maps_to_artifact_not_found() {
        let err: EtlError = object_store::Error::NotFound {
            path: "dim_currency/a.parquet".to_string(),
            source: Box::new(std::io::Error::other("missing")),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
    }
}
