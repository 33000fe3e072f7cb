use std::sync::Arc;

use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use tracing::{debug, info};

use crate::artifact::{decode_json_lines, decode_parquet};
use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::TabularValue;

/// Serialization format of an artifact, identified by its key extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Parquet,
    JsonLines,
}

impl ArtifactFormat {
    /// Returns the format of `key`, or `None` when the extension is not a tabular one.
    pub fn from_key(key: &str) -> Option<ArtifactFormat> {
        let (_, extension) = key.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "parquet" => Some(ArtifactFormat::Parquet),
            "jsonl" | "ndjson" => Some(ArtifactFormat::JsonLines),
            _ => None,
        }
    }
}

/// Picks the most recently modified object, breaking ties by the greatest key.
pub fn select_latest(objects: impl IntoIterator<Item = ObjectMeta>) -> Option<ObjectMeta> {
    objects
        .into_iter()
        .max_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.location.cmp(&b.location))
        })
}

/// Finds and reads the newest artifact of a table from object storage.
///
/// Artifacts of table `T` live under the `T/` prefix.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    store: Arc<dyn ObjectStore>,
}

impl ArtifactLocator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Returns the metadata of the newest tabular artifact under `table/`.
    pub async fn latest_artifact(&self, table: &str) -> EtlResult<ObjectMeta> {
        let prefix = Path::from(table);
        let objects = self
            .store
            .list(Some(&prefix))
            .try_collect::<Vec<_>>()
            .await?;

        if objects.is_empty() {
            bail!(
                ErrorKind::ArtifactNotFound,
                "No objects found for table",
                format!("No objects found under {table}/")
            );
        }

        let listed = objects.len();
        let tabular = objects
            .into_iter()
            .filter(|meta| ArtifactFormat::from_key(meta.location.as_ref()).is_some());

        match select_latest(tabular) {
            Some(latest) => {
                debug!(
                    table,
                    listed,
                    key = %latest.location,
                    last_modified = %latest.last_modified,
                    "selected latest artifact"
                );
                Ok(latest)
            }
            None => bail!(
                ErrorKind::ArtifactNotFound,
                "No tabular artifacts found for table",
                format!("{listed} objects under {table}/ but none is a .parquet, .jsonl or .ndjson file")
            ),
        }
    }

    /// Reads and decodes the artifact at `location`.
    pub async fn read(&self, location: &Path) -> EtlResult<TabularValue> {
        let Some(format) = ArtifactFormat::from_key(location.as_ref()) else {
            bail!(
                ErrorKind::InvalidData,
                "Unsupported artifact format",
                format!("Artifact {location} does not have a tabular extension")
            );
        };

        let bytes = self.store.get(location).await?.bytes().await?;
        let value = match format {
            ArtifactFormat::Parquet => decode_parquet(bytes)?,
            ArtifactFormat::JsonLines => decode_json_lines(&bytes)?,
        };

        info!(
            key = %location,
            rows = value.num_rows(),
            columns = value.columns().len(),
            "artifact read"
        );

        Ok(value)
    }

    /// Locates the newest artifact of `table` and returns its contents.
    pub async fn locate(&self, table: &str) -> EtlResult<TabularValue> {
        let latest = self.latest_artifact(table).await?;
        self.read(&latest.location).await
    }
}
