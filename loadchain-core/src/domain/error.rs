// loadchain-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Duplicate unit of work '{id}' (table '{table_name}')")]
    #[diagnostic(
        code(loadchain::domain::duplicate_unit),
        help("Each table_name must appear only once in the tables config.")
    )]
    DuplicateUnit { id: String, table_name: String },

    #[error("Invalid destination identifier '{0}'")]
    #[diagnostic(
        code(loadchain::domain::table_ref),
        help("Use 'dataset.table' or 'project.dataset.table'.")
    )]
    InvalidTableRef(String),

    #[error("Table '{0}' is not part of the compiled graph")]
    #[diagnostic(code(loadchain::domain::unknown_table))]
    UnknownTable(String),

    #[error("Chain for '{table_name}' is not linear: {reason}")]
    #[diagnostic(code(loadchain::domain::broken_chain))]
    BrokenChain { table_name: String, reason: String },
}
