// loadchain-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod local_store;
pub mod postgres;

pub use self::duckdb::{DuckDbSource, DuckDbWarehouse};
pub use local_store::LocalObjectStore;
pub use postgres::PostgresSource;
