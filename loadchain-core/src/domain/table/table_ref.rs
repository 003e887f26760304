// loadchain-core/src/domain/table/table_ref.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

/// Parsed destination identifier: `[project.]dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn parse(identifier: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = identifier.trim().split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(DomainError::InvalidTableRef(identifier.to_string()));
        }
        match parts.as_slice() {
            [dataset, table] => Ok(Self {
                project: None,
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            [project, dataset, table] => Ok(Self {
                project: Some(project.to_string()),
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            _ => Err(DomainError::InvalidTableRef(identifier.to_string())),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project {
            Some(project) => write!(f, "{}.{}.{}", project, self.dataset, self.table),
            None => write!(f, "{}.{}", self.dataset, self.table),
        }
    }
}
