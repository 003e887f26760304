// loadchain-core/src/domain/table/mod.rs

pub mod descriptor;
pub mod field_type;
pub mod table_ref;

pub use descriptor::{ColumnSpec, TableDescriptor};
pub use field_type::{FieldType, UnknownFieldType};
pub use table_ref::TableRef;
