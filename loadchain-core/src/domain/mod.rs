pub mod error;
pub mod graph;
pub mod naming;
pub mod settings;
pub mod table;

// Re-exports to keep imports short elsewhere
pub use error::DomainError;
pub use graph::{DependencyGraph, GraphCompiler, Stage, UnitId, UnitInputs, UnitOfWork};
pub use settings::{ConnectionString, PipelineSettings, RetryPolicy, StoreScheme, WriteMode};
pub use table::{ColumnSpec, FieldType, TableDescriptor, TableRef};
