// loadchain-core/src/ports/mod.rs
//
// Contracts for the external systems a chain talks to. Adapters live in infrastructure.

pub mod object_store;
pub mod source;
pub mod warehouse;

pub use object_store::ObjectStore;
pub use source::{SourceDatabase, TableSnapshot};
pub use warehouse::{LoadSummary, ProvisionOutcome, Warehouse};
