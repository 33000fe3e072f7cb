use std::future::Future;

use crate::error::EtlResult;
use crate::types::{Cell, TableRow};

/// A connection to the warehouse able to run parameterized statements.
///
/// Statements use positional `$n` placeholders bound to [`Cell`] values. Implementations run
/// statements one at a time on a single session, so `BEGIN`, `COMMIT` and `ROLLBACK` issued
/// through [`WarehouseClient::batch_execute`] frame the statements that follow them.
pub trait WarehouseClient {
    /// Executes a statement and returns the number of affected rows.
    fn execute(
        &self,
        statement: &str,
        params: &[Cell],
    ) -> impl Future<Output = EtlResult<u64>> + Send;

    /// Executes one or more statements without parameters.
    fn batch_execute(&self, statements: &str) -> impl Future<Output = EtlResult<()>> + Send;

    /// Runs a query and returns its rows.
    fn query(
        &self,
        statement: &str,
        params: &[Cell],
    ) -> impl Future<Output = EtlResult<Vec<TableRow>>> + Send;
}
