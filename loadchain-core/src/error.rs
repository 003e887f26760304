// loadchain-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{ConfigError, InfrastructureError};
use miette::Diagnostic;
use thiserror::Error;

/// Failure of a single unit of work. These are the errors the runner retries.
#[derive(Error, Debug, Diagnostic)]
pub enum StageError {
    #[error("Provisioning of '{destination}' failed: {source}")]
    #[diagnostic(code(loadchain::stage::provision))]
    Provision {
        destination: String,
        #[source]
        source: InfrastructureError,
    },

    #[error("Extract of '{table_name}' failed: {source}")]
    #[diagnostic(code(loadchain::stage::extract))]
    Extract {
        table_name: String,
        #[source]
        source: InfrastructureError,
    },

    #[error("Upload of '{key}' failed: {source}")]
    #[diagnostic(code(loadchain::stage::upload))]
    Upload {
        key: String,
        #[source]
        source: InfrastructureError,
    },

    #[error("Load into '{destination}' failed: {source}")]
    #[diagnostic(code(loadchain::stage::load))]
    Load {
        destination: String,
        #[source]
        source: InfrastructureError,
    },
}

#[derive(Error, Debug)]
pub enum LoadchainError {
    // --- Graph compilation (duplicates, identifiers) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- Tables config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- Adapters (IO, drivers, HTTP) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- Unit execution ---
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for LoadchainError {
    fn from(err: std::io::Error) -> Self {
        LoadchainError::Infrastructure(InfrastructureError::Io(err))
    }
}
