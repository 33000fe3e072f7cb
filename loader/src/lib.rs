//! Loads processed tabular artifacts from object storage into a Postgres dimensional warehouse.
//!
//! For each table the newest artifact under the table's prefix is decoded, coerced to the
//! column types read from the warehouse catalog and written in a single transaction:
//! dimension tables (`dim_*`) are upserted on their first column and fact tables (`fact_*`)
//! are appended.
//!
//! The entry point is [`orchestrator::LoadOrchestrator`], which works against any
//! [`warehouse::WarehouseClient`]. [`warehouse::PostgresClient`] is the production client.

pub mod artifact;
pub mod coercion;
pub mod conversions;
pub mod error;
mod macros;
pub mod metrics;
pub mod orchestrator;
pub mod plan;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod warehouse;
