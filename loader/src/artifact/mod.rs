//! Locating and decoding the tabular artifacts produced by the upstream processing stage.

mod jsonl;
mod locator;
mod parquet;
mod store;

pub use jsonl::decode_json_lines;
pub use locator::*;
pub use parquet::decode_parquet;
pub use store::create_object_store;
