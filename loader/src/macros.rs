//! Macros for building and returning [`crate::error::EtlError`] values.

/// Creates an [`crate::error::EtlError`] from a kind and a static description.
///
/// An optional third argument becomes the detail through its [`ToString`] impl, and a trailing
/// `source: err` chains the underlying error.
#[macro_export]
macro_rules! etl_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::EtlError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::EtlError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with the error built by [`etl_error!`] from the same arguments.
#[macro_export]
macro_rules! bail {
    ($($args:tt)+) => {
        return ::core::result::Result::Err($crate::etl_error!($($args)+))
    };
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, EtlResult};

    fn reject_empty_key(key: &str) -> EtlResult<&str> {
        if key.is_empty() {
            bail!(ErrorKind::InvalidData, "Artifact key is empty");
        }
        if !key.contains('/') {
            bail!(
                ErrorKind::InvalidData,
                "Artifact key has no table prefix",
                format!("Key {key} does not contain a '/' separator")
            );
        }

        Ok(key)
    }

    #[test]
    fn bail_returns_the_built_error() {
        assert_eq!(reject_empty_key("dim_date/a.parquet").unwrap(), "dim_date/a.parquet");

        let err = reject_empty_key("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.message(), "Artifact key is empty");

        let err = reject_empty_key("dim_date").unwrap_err();
        assert_eq!(
            err.message(),
            "Artifact key has no table prefix: Key dim_date does not contain a '/' separator"
        );
    }

    #[test]
    fn source_is_chained() {
        let io = std::io::Error::other("connection reset");
        let err = etl_error!(ErrorKind::StorageError, "Listing artifacts failed", "dim_date/", source: io);

        assert_eq!(err.detail(), Some("dim_date/"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
