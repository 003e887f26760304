// loadchain-core/src/infrastructure/error.rs

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(loadchain::infra::database::duckdb),
        help("An error occurred inside the DuckDB engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("PostgreSQL Error: {0}")]
    #[diagnostic(
        code(loadchain::infra::database::postgres),
        help("Check the source connection string and that the table exists.")
    )]
    Postgres(#[from] sqlx::Error),
}

/// Failures reading the tables config. Always fatal, raised before any unit runs.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Tables configuration not found: {0}")]
    #[diagnostic(
        code(loadchain::config::not_found),
        help("Pass --config or place config.json under the root directory.")
    )]
    NotFound(String),

    #[error("Cannot read tables configuration at {path:?}: {source}")]
    #[diagnostic(code(loadchain::config::unreadable))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed tables configuration at {path:?}: {message}")]
    #[diagnostic(
        code(loadchain::config::malformed),
        help("Each entry needs table_name, schema [{{name, type}}] and bigquery_table.")
    )]
    Malformed { path: PathBuf, message: String },

    #[error("Invalid table descriptor '{table_name}': {message}")]
    #[diagnostic(code(loadchain::config::invalid))]
    Invalid { table_name: String, message: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(loadchain::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    #[diagnostic(code(loadchain::infra::csv))]
    Csv(#[from] csv::Error),

    // --- GOOGLE APIS ---
    #[error("HTTP Error: {0}")]
    #[diagnostic(code(loadchain::infra::http))]
    Http(#[from] reqwest::Error),

    #[error("{service} API returned {status}: {body}")]
    #[diagnostic(code(loadchain::infra::api))]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Authentication Error: {0}")]
    #[diagnostic(
        code(loadchain::infra::auth),
        help("Set GOOGLE_OAUTH_ACCESS_TOKEN or run on a host with a metadata server.")
    )]
    Auth(String),

    #[error("Load job {job_id} failed: {message}")]
    #[diagnostic(code(loadchain::infra::job_failed))]
    JobFailed { job_id: String, message: String },

    #[error("No project for destination '{0}'")]
    #[diagnostic(
        code(loadchain::infra::missing_project),
        help("Use a project.dataset.table identifier or set GOOGLE_CLOUD_PROJECT.")
    )]
    MissingProject(String),

    #[error("Unsupported URI '{uri}' (expected {expected})")]
    #[diagnostic(code(loadchain::infra::uri))]
    UnsupportedUri { uri: String, expected: &'static str },

    #[error("Unsupported value in column '{column}': {message}")]
    #[diagnostic(code(loadchain::infra::decode))]
    Decode { column: String, message: String },
}

// Shortcuts for `?` on driver calls
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<sqlx::Error> for InfrastructureError {
    fn from(err: sqlx::Error) -> Self {
        InfrastructureError::Database(DatabaseError::Postgres(err))
    }
}
