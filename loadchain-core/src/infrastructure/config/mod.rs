pub mod tables;

pub use tables::{TablesFile, find_tables_config, load_tables_config};
