// loadchain-core/src/infrastructure/factory.rs
//
// Picks the adapter behind each port from the resolved settings.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::settings::{ConnectionString, StoreScheme};
use crate::infrastructure::adapters::{
    DuckDbSource, DuckDbWarehouse, LocalObjectStore, PostgresSource,
};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::gcp::{BigQueryWarehouse, GcsObjectStore, TokenProvider};
use crate::ports::{ObjectStore, SourceDatabase, Warehouse};

/// Where loads go: BigQuery, or a DuckDB file for local runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WarehouseTarget {
    #[default]
    BigQuery,
    DuckDb(String),
}

impl FromStr for WarehouseTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bigquery") {
            Ok(WarehouseTarget::BigQuery)
        } else if let Some(path) = s.strip_prefix("duckdb://") {
            if path.is_empty() {
                Err("duckdb warehouse needs a path: duckdb://<file>".to_string())
            } else {
                Ok(WarehouseTarget::DuckDb(path.to_string()))
            }
        } else {
            Err(format!(
                "unknown warehouse '{}' (expected bigquery or duckdb://<file>)",
                s
            ))
        }
    }
}

impl fmt::Display for WarehouseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseTarget::BigQuery => f.write_str("bigquery"),
            WarehouseTarget::DuckDb(path) => write!(f, "duckdb://{}", path),
        }
    }
}

/// Shared HTTP client and lazily created token provider for the Google adapters.
#[derive(Default)]
pub struct AdapterFactory {
    client: reqwest::Client,
    tokens: Option<Arc<TokenProvider>>,
    default_project: Option<String>,
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_project(mut self, project: Option<String>) -> Self {
        self.default_project = project;
        self
    }

    /// Overrides the token source, e.g. a fixed token in tests.
    pub fn with_tokens(mut self, tokens: Arc<TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn tokens(&mut self) -> Arc<TokenProvider> {
        let client = self.client.clone();
        self.tokens
            .get_or_insert_with(|| Arc::new(TokenProvider::from_env(client)))
            .clone()
    }

    pub fn source(
        &self,
        connection: &ConnectionString,
    ) -> Result<Arc<dyn SourceDatabase>, InfrastructureError> {
        match connection.scheme() {
            Some("postgres") | Some("postgresql") => Ok(Arc::new(PostgresSource::new())),
            Some("duckdb") => Ok(Arc::new(DuckDbSource::new())),
            _ => Err(InfrastructureError::UnsupportedUri {
                uri: connection.redacted(),
                expected: "postgres://... or duckdb://...",
            }),
        }
    }

    pub fn store(&mut self, store: StoreScheme) -> Arc<dyn ObjectStore> {
        match store {
            StoreScheme::Gcs => Arc::new(GcsObjectStore::new(self.client.clone(), self.tokens())),
            StoreScheme::Local => Arc::new(LocalObjectStore::new()),
        }
    }

    pub fn warehouse(
        &mut self,
        target: &WarehouseTarget,
    ) -> Result<Arc<dyn Warehouse>, InfrastructureError> {
        match target {
            WarehouseTarget::BigQuery => Ok(Arc::new(
                BigQueryWarehouse::new(self.client.clone(), self.tokens())
                    .with_default_project(self.default_project.clone()),
            )),
            WarehouseTarget::DuckDb(path) => Ok(Arc::new(DuckDbWarehouse::new(path)?)),
        }
    }
}
