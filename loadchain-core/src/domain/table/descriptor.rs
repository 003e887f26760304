// loadchain-core/src/domain/table/descriptor.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

use super::field_type::FieldType;

fn re_table_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

/// One column of a destination table, in load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ColumnSpec {
    #[validate(length(min = 1, message = "column name cannot be empty"))]
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A table to move from the source database into the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TableDescriptor {
    #[validate(custom(function = "validate_table_name"))]
    pub table_name: String,

    #[validate(length(min = 1, message = "schema must declare at least one column"))]
    #[validate(custom(function = "validate_unique_columns"))]
    #[validate(nested)]
    pub schema: Vec<ColumnSpec>,

    #[serde(rename = "bigquery_table")]
    #[validate(length(min = 1, message = "bigquery_table cannot be empty"))]
    pub destination_identifier: String,
}

impl TableDescriptor {
    pub fn new(
        table_name: impl Into<String>,
        schema: Vec<ColumnSpec>,
        destination_identifier: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            schema,
            destination_identifier: destination_identifier.into(),
        }
    }
}

fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    if re_table_name().is_match(name) {
        return Ok(());
    }
    Err(ValidationError::new("table_name").with_message(Cow::Owned(format!(
        "'{}' is not a valid table name (letters, digits and '_', optionally 'schema.table')",
        name
    ))))
}

fn validate_unique_columns(columns: &[ColumnSpec]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.to_lowercase()) {
            return Err(ValidationError::new("duplicate_column")
                .with_message(Cow::Owned(format!("column '{}' is declared twice", column.name))));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn orders() -> TableDescriptor {
        TableDescriptor::new(
            "orders",
            vec![
                ColumnSpec::new("id", FieldType::Integer),
                ColumnSpec::new("amount", FieldType::Float),
            ],
            "proj.ds.orders",
        )
    }

    #[test]
    fn test_valid_descriptor() {
        assert!(orders().validate().is_ok());
    }

    #[test]
    fn test_schema_qualified_table_name_is_allowed() {
        let mut desc = orders();
        desc.table_name = "public.orders".into();
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_table_name_with_spaces_is_rejected() {
        let mut desc = orders();
        desc.table_name = "orders; DROP TABLE x".into();
        let errors = desc.validate().unwrap_err();
        assert!(errors.to_string().contains("not a valid table name"));
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let mut desc = orders();
        desc.schema.push(ColumnSpec::new("ID", FieldType::String));
        let errors = desc.validate().unwrap_err();
        assert!(errors.to_string().contains("declared twice"));
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        let mut desc = orders();
        desc.schema.clear();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_config_shape() {
        let json = r#"{
            "table_name": "orders",
            "schema": [{"name": "id", "type": "INTEGER"}, {"name": "amount", "type": "FLOAT"}],
            "bigquery_table": "proj.ds.orders"
        }"#;
        let desc: TableDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc, orders());
    }
}
