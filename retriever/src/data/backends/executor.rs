use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::RawTable;

#[async_trait]
pub trait QueryExecutor: Send + Sync + std::fmt::Debug {
    /// Run one query over a window given as an ISO 8601 duration (`PT1H`).
    ///
    /// Either the whole primary table comes back or an error does; there is
    /// no partial result and no retry.
    async fn execute(&self, query: &str, timespan: &str) -> Result<RawTable, DataError>;

    /// Human-readable backend name
    fn name(&self) -> &'static str;
}
