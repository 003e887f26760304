// loadchain-core/src/ports/source.rs

use async_trait::async_trait;

use crate::domain::settings::ConnectionString;
use crate::infrastructure::error::InfrastructureError;

/// Result of a full-table read, every value rendered as text (`None` is SQL NULL).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Column names, taken from the query result metadata.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Reads every row of `table_name`, unfiltered and unpaginated.
    /// Implementations open their own connection and close it before returning, on success or failure.
    async fn read_table(
        &self,
        connection: &ConnectionString,
        table_name: &str,
    ) -> Result<TableSnapshot, InfrastructureError>;

    fn engine_name(&self) -> &str;
}
