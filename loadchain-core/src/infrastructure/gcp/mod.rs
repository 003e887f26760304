// loadchain-core/src/infrastructure/gcp/mod.rs
//
// Google Cloud adapters over the plain REST APIs.

pub mod auth;
pub mod bigquery;
pub mod gcs;

pub use auth::TokenProvider;
pub use bigquery::BigQueryWarehouse;
pub use gcs::GcsObjectStore;
