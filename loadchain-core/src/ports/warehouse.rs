// loadchain-core/src/ports/warehouse.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::settings::WriteMode;
use crate::domain::table::{ColumnSpec, TableRef};
use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadSummary {
    /// Rows written by the job, when the warehouse reports it.
    pub rows_loaded: Option<u64>,
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Creates the table with `schema` if absent. Never alters an existing table.
    async fn ensure_table(
        &self,
        destination: &TableRef,
        schema: &[ColumnSpec],
    ) -> Result<ProvisionOutcome, InfrastructureError>;

    /// Loads headered CSV at `object_uri` positionally against `schema`.
    /// Returns once the warehouse reports the job finished.
    async fn load_csv(
        &self,
        object_uri: &str,
        destination: &TableRef,
        schema: &[ColumnSpec],
        write_mode: WriteMode,
    ) -> Result<LoadSummary, InfrastructureError>;

    fn engine_name(&self) -> &str;
}
