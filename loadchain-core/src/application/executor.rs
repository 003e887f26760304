// loadchain-core/src/application/executor.rs

use serde::Serialize;
use std::sync::Arc;

use crate::application::stages::{self, StagingArtifact};
use crate::domain::graph::{UnitInputs, UnitOfWork};
use crate::error::StageError;
use crate::ports::{LoadSummary, ObjectStore, ProvisionOutcome, SourceDatabase, Warehouse};

/// What a unit produced, kept in run reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum UnitOutput {
    Provision { outcome: ProvisionOutcome },
    Extract { artifact: StagingArtifact },
    Upload { object_uri: String },
    Load { summary: LoadSummary },
}

impl UnitOutput {
    /// One-line description for events and the CLI.
    pub fn describe(&self) -> String {
        match self {
            UnitOutput::Provision { outcome } => match outcome {
                ProvisionOutcome::Created => "table created".to_string(),
                ProvisionOutcome::AlreadyExists => "table already exists".to_string(),
            },
            UnitOutput::Extract { artifact } => format!(
                "{} rows x {} columns -> {}",
                artifact.rows,
                artifact.columns.len(),
                artifact.path.display()
            ),
            UnitOutput::Upload { object_uri } => format!("uploaded to {}", object_uri),
            UnitOutput::Load { summary } => match summary.rows_loaded {
                Some(rows) => format!("{} rows loaded", rows),
                None => "load job done".to_string(),
            },
        }
    }
}

/// Dispatches units to their stage with the configured adapters.
#[derive(Clone)]
pub struct UnitExecutor {
    source: Arc<dyn SourceDatabase>,
    store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
}

impl UnitExecutor {
    pub fn new(
        source: Arc<dyn SourceDatabase>,
        store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self {
            source,
            store,
            warehouse,
        }
    }

    pub async fn execute(&self, unit: &UnitOfWork) -> Result<UnitOutput, StageError> {
        match unit.inputs() {
            UnitInputs::Provision {
                destination,
                schema,
            } => {
                let outcome = stages::ensure_table(&*self.warehouse, destination, schema).await?;
                Ok(UnitOutput::Provision { outcome })
            }
            UnitInputs::Extract {
                table_name,
                source_connection,
                staging_path,
            } => {
                let artifact =
                    stages::extract(&*self.source, table_name, source_connection, staging_path)
                        .await?;
                Ok(UnitOutput::Extract { artifact })
            }
            UnitInputs::Upload {
                staging_path,
                container,
                key,
            } => {
                let object_uri =
                    stages::upload(&*self.store, staging_path, container, key).await?;
                Ok(UnitOutput::Upload { object_uri })
            }
            UnitInputs::Load {
                object_uri,
                destination,
                schema,
                write_mode,
            } => {
                let summary = stages::load(
                    &*self.warehouse,
                    object_uri,
                    destination,
                    schema,
                    *write_mode,
                )
                .await?;
                Ok(UnitOutput::Load { summary })
            }
        }
    }
}
