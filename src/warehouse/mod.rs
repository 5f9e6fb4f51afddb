mod local_loader;
mod redshift;
mod sqlite;

pub use local_loader::{load_json_files, LocalLoadError};
pub use redshift::RedshiftWarehouse;
pub use sqlite::SqliteWarehouse;

use crate::sql::Dialect;
use crate::statements::StagingLoad;
use anyhow::Result;
use async_trait::async_trait;

/// A connection to the warehouse the pipeline writes into.
///
/// Statements are executed one at a time on a single connection, in the
/// order they are issued.
#[async_trait]
pub trait Warehouse: Send {
    /// The SQL dialect this warehouse understands.
    fn dialect(&self) -> Dialect;

    /// Executes a single statement, returning the number of affected rows
    /// (zero for DDL).
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Runs a query returning a single integer (e.g. a `COUNT(*)`).
    async fn query_i64(&mut self, sql: &str) -> Result<i64>;

    /// Bulk loads a set of JSON files into a staging table.
    async fn bulk_load(&mut self, load: &StagingLoad) -> Result<u64>;
}
