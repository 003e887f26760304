// loadchain-core/src/infrastructure/config/tables.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::table::TableDescriptor;
use crate::infrastructure::error::ConfigError;

const CANDIDATES: [&str; 4] = ["config.json", "config.yaml", "config.yml", "dags/config.json"];

/// On-disk shape of the tables config: `{ "tables": [ ... ] }`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TablesFile {
    pub tables: Vec<TableDescriptor>,
}

enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Looks for the tables config under `root`.
pub fn find_tables_config(root: &Path) -> Result<PathBuf, ConfigError> {
    for filename in CANDIDATES {
        let p = root.join(filename);
        if p.is_file() {
            return Ok(p);
        }
    }
    Err(ConfigError::NotFound(format!(
        "no tables config in {:?}. Checked: {:?}",
        root, CANDIDATES
    )))
}

/// Reads and validates the table descriptors, in file order.
#[instrument]
pub fn load_tables_config(path: &Path) -> Result<Vec<TableDescriptor>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |message: String| ConfigError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let file: TablesFile = match Format::of(path) {
        Format::Json => serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?,
        Format::Yaml => serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string()))?,
    };

    for descriptor in &file.tables {
        descriptor
            .validate()
            .map_err(|errors| ConfigError::Invalid {
                table_name: descriptor.table_name.clone(),
                message: errors.to_string(),
            })?;
    }

    info!(tables = file.tables.len(), "Tables config loaded");
    Ok(file.tables)
}
