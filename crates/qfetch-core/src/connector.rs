//! The remote query execution boundary
//!
//! The cache manager consumes the remote engine only through this trait:
//! "given a query string, return a tabular result". Transport, retry and
//! authentication concerns all live behind it.

use crate::error::ConnectorError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

/// Executes queries against a remote analytical engine.
///
/// Implementations may return an empty result instead of an error when the
/// remote call fails; callers must not treat an empty result as proof that
/// the query matched zero rows.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Execute a query and return all result batches.
    async fn execute(&self, query: &str) -> Result<Vec<RecordBatch>, ConnectorError>;
}
