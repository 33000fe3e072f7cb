//! Metrics definitions for warehouse load monitoring.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for table name in metrics.
pub const TABLE_NAME_LABEL: &str = "table_name";

/// Label for the load status (`success` or `failed`).
pub const STATUS_LABEL: &str = "status";

/// Label for the write operation (`upsert` or `insert`).
pub const OPERATION_LABEL: &str = "operation";

/// Counter for table loads, labeled by table and status.
pub const LOADER_TABLE_LOADS_TOTAL: &str = "loader_table_loads_total";

/// Counter for rows written to the warehouse.
pub const LOADER_ROWS_LOADED_TOTAL: &str = "loader_rows_loaded_total";

/// Counter for cells replaced by null during coercion.
pub const LOADER_COERCED_NULLS_TOTAL: &str = "loader_coerced_nulls_total";

/// Histogram of the time spent loading one table.
pub const LOADER_TABLE_LOAD_DURATION_SECONDS: &str = "loader_table_load_duration_seconds";

/// Registers metric descriptions. Safe to call multiple times.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            LOADER_TABLE_LOADS_TOTAL,
            Unit::Count,
            "Total number of table loads, labeled by table_name and status"
        );

        describe_counter!(
            LOADER_ROWS_LOADED_TOTAL,
            Unit::Count,
            "Total number of rows written to the warehouse"
        );

        describe_counter!(
            LOADER_COERCED_NULLS_TOTAL,
            Unit::Count,
            "Total number of cells set to null because they did not fit the column type"
        );

        describe_histogram!(
            LOADER_TABLE_LOAD_DURATION_SECONDS,
            Unit::Seconds,
            "Time taken to load one table, from locating the artifact to commit"
        );
    });
}
