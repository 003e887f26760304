// loadchain-core/src/application/pipeline.rs
//
// Config -> graph -> runner -> report. What the CLI `plan` and `run` commands call.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::events::EventSink;
use crate::application::executor::UnitExecutor;
use crate::application::runner::{LocalRunner, RunReport};
use crate::domain::graph::{DependencyGraph, GraphCompiler};
use crate::domain::naming::run_report_path;
use crate::domain::settings::PipelineSettings;
use crate::error::LoadchainError;
use crate::infrastructure::config::{find_tables_config, load_tables_config};

/// Loads the tables config and compiles it. `tables` restricts the graph when non-empty.
#[instrument(skip_all, fields(root = %settings.root_dir.display()))]
pub fn compile_graph(
    settings: &PipelineSettings,
    config_path: Option<&Path>,
    tables: &[String],
) -> Result<DependencyGraph, LoadchainError> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => find_tables_config(&settings.root_dir)?,
    };
    info!(config = %path.display(), "Loading tables config");

    let descriptors = load_tables_config(&path)?;
    let graph = GraphCompiler::new(settings).compile(&descriptors)?;
    graph.verify()?;

    if tables.is_empty() {
        Ok(graph)
    } else {
        Ok(graph.select(tables)?)
    }
}

pub struct RunOptions {
    pub concurrency: usize,
    pub sink: Option<Arc<dyn EventSink>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: crate::application::runner::DEFAULT_CONCURRENCY,
            sink: None,
        }
    }
}

/// Runs the graph and writes `target/run_results.json` under the root.
/// A failed unit is reported in the returned report, not as an error.
pub async fn run_pipeline(
    settings: &PipelineSettings,
    graph: &DependencyGraph,
    executor: &UnitExecutor,
    options: RunOptions,
) -> Result<RunReport, LoadchainError> {
    let mut runner = LocalRunner::new(executor).with_concurrency(options.concurrency);
    if let Some(sink) = options.sink {
        runner = runner.with_sink(sink);
    }

    let report = runner.run(graph).await;

    let report_path = run_report_path(&settings.root_dir);
    report.save(&report_path)?;
    info!(path = %report_path.display(), success = report.success, "Run report saved");

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::testing::{MockSource, MockStore, MockWarehouse, settings};
    use crate::domain::error::DomainError;
    use crate::infrastructure::error::ConfigError;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = r#"{"tables": [
        {"table_name": "orders", "schema": [{"name": "id", "type": "INTEGER"}], "bigquery_table": "proj.ds.orders"},
        {"table_name": "customers", "schema": [{"name": "id", "type": "INTEGER"}], "bigquery_table": "proj.ds.customers"}
    ]}"#;

    #[test]
    fn test_compile_discovers_config_under_root() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), CONFIG)?;

        let graph = compile_graph(&settings(dir.path()), None, &[])?;
        assert_eq!(graph.unit_count(), 8);
        assert_eq!(graph.edges().len(), 6);
        Ok(())
    }

    #[test]
    fn test_compile_with_table_selection() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tables.json");
        fs::write(&path, CONFIG)?;

        let graph = compile_graph(&settings(dir.path()), Some(&path), &["customers".into()])?;
        assert_eq!(graph.chains().len(), 1);
        assert_eq!(graph.chains()[0].table_name(), "customers");

        let err = compile_graph(&settings(dir.path()), Some(&path), &["ghost".into()]).unwrap_err();
        assert!(matches!(err, LoadchainError::Domain(DomainError::UnknownTable(_))));
        Ok(())
    }

    #[test]
    fn test_missing_config_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let err = compile_graph(&settings(dir.path()), None, &[]).unwrap_err();
        assert!(matches!(err, LoadchainError::Config(ConfigError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_duplicate_table_produces_no_graph() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("config.json"),
            r#"{"tables": [
                {"table_name": "orders", "schema": [{"name": "id", "type": "INTEGER"}], "bigquery_table": "ds.a"},
                {"table_name": "orders", "schema": [{"name": "id", "type": "INTEGER"}], "bigquery_table": "ds.b"}
            ]}"#,
        )?;
        let err = compile_graph(&settings(dir.path()), None, &[]).unwrap_err();
        assert!(matches!(
            err,
            LoadchainError::Domain(DomainError::DuplicateUnit { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_writes_report_under_target() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), CONFIG)?;
        let settings = settings(dir.path());
        let graph = compile_graph(&settings, None, &[])?;

        let executor = UnitExecutor::new(
            Arc::new(MockSource::with_rows(&["id"], vec![vec![Some("1")]])),
            Arc::new(MockStore::default()),
            Arc::new(MockWarehouse::default()),
        );
        let report = run_pipeline(&settings, &graph, &executor, RunOptions::default()).await?;

        assert!(report.success);
        assert!(dir.path().join("target/run_results.json").exists());
        assert!(dir.path().join("data/orders_data.csv").exists());
        assert!(dir.path().join("data/customers_data.csv").exists());
        Ok(())
    }
}
