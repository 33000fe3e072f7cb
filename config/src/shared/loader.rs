use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

fn default_namespace() -> String {
    LoaderConfig::DEFAULT_NAMESPACE.to_string()
}

fn default_text_default() -> String {
    LoaderConfig::DEFAULT_TEXT_DEFAULT.to_string()
}

const fn default_write_chunk_size() -> usize {
    LoaderConfig::DEFAULT_WRITE_CHUNK_SIZE
}

/// Behavior of the load pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Warehouse schema the dimensional model lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Value written into `NOT NULL` text columns that received no value.
    #[serde(default = "default_text_default")]
    pub text_default: String,
    /// Number of rows between write progress log lines.
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
    /// Restricts a full load to these tables. All tables are loaded when absent.
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

impl LoaderConfig {
    pub const DEFAULT_NAMESPACE: &'static str = "public";
    pub const DEFAULT_TEXT_DEFAULT: &'static str = "Unknown";
    pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 1000;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.write_chunk_size == 0 {
            return Err(ValidationError::WriteChunkSizeZero);
        }
        if self.namespace.trim().is_empty() {
            return Err(ValidationError::EmptyNamespace);
        }

        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            text_default: default_text_default(),
            write_chunk_size: default_write_chunk_size(),
            tables: None,
        }
    }
}
