// loadchain-core/src/lib.rs

#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: contracts for the source database, object store and warehouse.
pub mod ports;

// 2. Domain: table descriptors, settings, naming conventions and the graph compiler.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: config files, Postgres/DuckDB/GCS/BigQuery adapters.
pub mod infrastructure;

// 4. Application: stages, unit executor, local runner, plan rendering, clean.
pub mod application;

pub mod error;

pub use error::{LoadchainError, StageError};
