// loadchain-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod factory;
pub mod fs;
pub mod gcp;
pub mod sql;
pub mod staging;
