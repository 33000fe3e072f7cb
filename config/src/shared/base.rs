use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// The S3 bucket name is empty.
    #[error("Invalid object store config: `bucket` cannot be empty")]
    EmptyBucket,
    /// The write chunk size cannot be zero.
    #[error("`write_chunk_size` cannot be zero")]
    WriteChunkSizeZero,
    /// The warehouse namespace is empty.
    #[error("`namespace` cannot be empty")]
    EmptyNamespace,
    /// A required warehouse connection value is missing.
    #[error("Invalid warehouse config: `{0}` must be set")]
    MissingWarehouseValue(&'static str),
}
