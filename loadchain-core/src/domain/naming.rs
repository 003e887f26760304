// loadchain-core/src/domain/naming.rs
//
// File, key and URI conventions shared by the extract, upload and load stages.
// The stages never hand the full path to each other, they all derive it from here.

use std::path::{Path, PathBuf};

use crate::domain::settings::StoreScheme;

pub const STAGING_DIR: &str = "data";
pub const REPORT_DIR: &str = "target";
pub const STAGING_SUFFIX: &str = "_data.csv";
pub const RUN_REPORT: &str = "run_results.json";

/// `{root}/data/{table_name}_data.csv`
pub fn staging_path(root: &Path, table_name: &str) -> PathBuf {
    root.join(STAGING_DIR).join(object_key(table_name))
}

/// `{table_name}_data.csv`
pub fn object_key(table_name: &str) -> String {
    format!("{}{}", table_name, STAGING_SUFFIX)
}

/// `{root}/target/run_results.json`
pub fn run_report_path(root: &Path) -> PathBuf {
    root.join(REPORT_DIR).join(RUN_REPORT)
}

/// `{scheme}://{container}/{key}`
pub fn object_uri(store: StoreScheme, container: &str, key: &str) -> String {
    format!(
        "{}://{}/{}",
        store.scheme(),
        container.trim_end_matches('/'),
        key
    )
}
