//! Warehouse access: the client seam, catalog reads, DDL and row writes.

mod base;
mod catalog;
mod postgres;
mod writer;

pub use base::WarehouseClient;
pub use catalog::{ensure_dimensional_model, read_schema};
pub use postgres::PostgresClient;
pub use writer::WarehouseWriter;
