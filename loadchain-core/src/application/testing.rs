// loadchain-core/src/application/testing.rs
//
// In-memory ports shared by the application tests.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::settings::{ConnectionString, PipelineSettings, RetryPolicy, WriteMode};
use crate::domain::table::{ColumnSpec, FieldType, TableDescriptor, TableRef};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::{
    LoadSummary, ObjectStore, ProvisionOutcome, SourceDatabase, TableSnapshot, Warehouse,
};

const ANY_TABLE: &str = "*";

pub fn settings(root: &Path) -> PipelineSettings {
    PipelineSettings::new(
        root,
        ConnectionString::new("postgres://etl:pw@db/shop"),
        "landing",
    )
    .with_retry_policy(RetryPolicy::new(1, Duration::ZERO))
}

pub fn descriptor(table_name: &str) -> TableDescriptor {
    TableDescriptor::new(
        table_name,
        vec![
            ColumnSpec::new("id", FieldType::Integer),
            ColumnSpec::new("amount", FieldType::Float),
        ],
        format!("proj.ds.{}", table_name),
    )
}

pub fn orders() -> TableDescriptor {
    descriptor("orders")
}

fn unavailable(what: &str) -> InfrastructureError {
    InfrastructureError::Io(std::io::Error::other(format!("{} unavailable", what)))
}

#[derive(Default)]
pub struct MockSource {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn with_rows(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
            ..Self::default()
        }
    }

    /// Fails the next `times` reads of any table.
    pub fn failing(times: usize) -> Self {
        Self::default().fail_table(ANY_TABLE, times)
    }

    /// Fails the next `times` reads of `table_name`.
    pub fn fail_table(self, table_name: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(table_name.to_string(), times);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceDatabase for MockSource {
    async fn read_table(
        &self,
        _connection: &ConnectionString,
        table_name: &str,
    ) -> Result<TableSnapshot, InfrastructureError> {
        self.calls.lock().unwrap().push(table_name.to_string());

        let mut failures = self.failures.lock().unwrap();
        let key = if failures.contains_key(table_name) {
            table_name
        } else {
            ANY_TABLE
        };
        if let Some(remaining) = failures.get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(unavailable("source"));
        }

        Ok(TableSnapshot {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        })
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
pub struct MockStore {
    calls: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn put_file(
        &self,
        _source: &Path,
        container: &str,
        key: &str,
    ) -> Result<String, InfrastructureError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("put {}/{}", container, key));
        Ok(format!("gs://{}/{}", container, key))
    }

    fn scheme(&self) -> &str {
        "gs"
    }
}

#[derive(Default)]
pub struct MockWarehouse {
    tables: Mutex<HashSet<String>>,
    failing_loads: Mutex<usize>,
    calls: Mutex<Vec<String>>,
}

impl MockWarehouse {
    /// Fails the next `times` loads, whatever the destination.
    pub fn failing_loads(times: usize) -> Self {
        Self {
            failing_loads: Mutex::new(times),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn ensure_table(
        &self,
        destination: &TableRef,
        _schema: &[ColumnSpec],
    ) -> Result<ProvisionOutcome, InfrastructureError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("ensure_table {}", destination));
        if self.tables.lock().unwrap().insert(destination.to_string()) {
            Ok(ProvisionOutcome::Created)
        } else {
            Ok(ProvisionOutcome::AlreadyExists)
        }
    }

    async fn load_csv(
        &self,
        object_uri: &str,
        destination: &TableRef,
        _schema: &[ColumnSpec],
        write_mode: WriteMode,
    ) -> Result<LoadSummary, InfrastructureError> {
        let mode = match write_mode {
            WriteMode::Truncate => "truncate",
            WriteMode::Append => "append",
        };
        self.calls.lock().unwrap().push(format!(
            "load_csv {} -> {} ({})",
            object_uri, destination, mode
        ));

        let mut failing = self.failing_loads.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(unavailable("warehouse"));
        }
        Ok(LoadSummary {
            rows_loaded: Some(0),
        })
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}
