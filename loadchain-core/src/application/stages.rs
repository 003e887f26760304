// loadchain-core/src/application/stages.rs
//
// The four operations of a table chain. Each wraps the adapter failure in the
// StageError of its stage; retries belong to the runner, never to a stage.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::settings::{ConnectionString, WriteMode};
use crate::domain::table::{ColumnSpec, TableRef};
use crate::error::StageError;
use crate::infrastructure::staging::write_snapshot;
use crate::ports::{LoadSummary, ObjectStore, ProvisionOutcome, SourceDatabase, Warehouse};

/// Staging file produced by one extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingArtifact {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: usize,
}

#[instrument(skip(warehouse, schema), fields(destination = %destination, engine = warehouse.engine_name()))]
pub async fn ensure_table(
    warehouse: &dyn Warehouse,
    destination: &TableRef,
    schema: &[ColumnSpec],
) -> Result<ProvisionOutcome, StageError> {
    let outcome = warehouse
        .ensure_table(destination, schema)
        .await
        .map_err(|source| StageError::Provision {
            destination: destination.to_string(),
            source,
        })?;
    info!(?outcome, "Destination provisioned");
    Ok(outcome)
}

#[instrument(skip(source, connection), fields(engine = source.engine_name()))]
pub async fn extract(
    source: &dyn SourceDatabase,
    table_name: &str,
    connection: &ConnectionString,
    staging_path: &Path,
) -> Result<StagingArtifact, StageError> {
    let failed = |source| StageError::Extract {
        table_name: table_name.to_string(),
        source,
    };

    let snapshot = source.read_table(connection, table_name).await.map_err(failed)?;
    write_snapshot(staging_path, &snapshot).map_err(failed)?;

    let artifact = StagingArtifact {
        path: staging_path.to_path_buf(),
        rows: snapshot.rows.len(),
        columns: snapshot.columns,
    };
    info!(rows = artifact.rows, path = %artifact.path.display(), "Staging file written");
    Ok(artifact)
}

#[instrument(skip(store), fields(scheme = store.scheme()))]
pub async fn upload(
    store: &dyn ObjectStore,
    staging_path: &Path,
    container: &str,
    key: &str,
) -> Result<String, StageError> {
    let uri = store
        .put_file(staging_path, container, key)
        .await
        .map_err(|source| StageError::Upload {
            key: key.to_string(),
            source,
        })?;
    info!(%uri, "Staging file uploaded");
    Ok(uri)
}

#[instrument(skip(warehouse, schema), fields(destination = %destination, engine = warehouse.engine_name()))]
pub async fn load(
    warehouse: &dyn Warehouse,
    object_uri: &str,
    destination: &TableRef,
    schema: &[ColumnSpec],
    write_mode: WriteMode,
) -> Result<LoadSummary, StageError> {
    let summary = warehouse
        .load_csv(object_uri, destination, schema, write_mode)
        .await
        .map_err(|source| StageError::Load {
            destination: destination.to_string(),
            source,
        })?;
    info!(rows = ?summary.rows_loaded, "Load finished");
    Ok(summary)
}
