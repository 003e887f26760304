// loadchain-core/src/infrastructure/sql.rs
//
// Identifier and literal quoting shared by the Postgres and DuckDB adapters.
// Both engines follow ANSI double-quote rules.

use crate::domain::table::TableRef;

/// `name` -> `"name"`, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes every dot-separated part: `sales.orders` -> `"sales"."orders"`.
pub fn quote_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// Lower-cases each part before quoting, which is how Postgres resolves an unquoted
/// `Sales.Orders`. Source table names are plain identifiers, so nothing else changes.
pub fn quote_folded(name: &str) -> String {
    name.split('.')
        .map(|part| quote_ident(&part.to_lowercase()))
        .collect::<Vec<_>>()
        .join(".")
}

/// `dataset.table` of a destination. The project part has no meaning for a local engine.
pub fn quote_table_ref(table: &TableRef) -> String {
    format!("{}.{}", quote_ident(&table.dataset), quote_ident(&table.table))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
