use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::ArrowWriter;

use crate::error::EtlResult;

/// Returns an empty in-memory object store.
pub fn memory_store() -> Arc<InMemory> {
    Arc::new(InMemory::new())
}

/// Stores raw bytes under `key`.
pub async fn put_bytes(store: &dyn ObjectStore, key: &str, bytes: Vec<u8>) -> EtlResult<()> {
    store.put(&Path::from(key), PutPayload::from(bytes)).await?;

    Ok(())
}

/// Encodes `batch` as a parquet file and stores it under `key`.
pub async fn put_parquet(store: &dyn ObjectStore, key: &str, batch: &RecordBatch) -> EtlResult<()> {
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;

    put_bytes(store, key, buffer).await
}

/// Stores one JSON document per line under `key`.
pub async fn put_json_lines(
    store: &dyn ObjectStore,
    key: &str,
    records: &[serde_json::Value],
) -> EtlResult<()> {
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buffer, record)?;
        buffer.push(b'\n');
    }

    put_bytes(store, key, buffer).await
}
