// loadchain-core/src/application/clean.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::naming::{REPORT_DIR, STAGING_DIR, STAGING_SUFFIX};
use crate::error::LoadchainError;

/// Resolves `rel` under `root`, refusing anything that lands outside it (symlinks included).
fn contained(root: &Path, rel: &str) -> Result<Option<PathBuf>, LoadchainError> {
    let full_path = root.join(rel);
    if !full_path.exists() {
        return Ok(None);
    }
    let resolved = full_path.canonicalize()?;
    if !resolved.starts_with(root) {
        return Err(LoadchainError::UnsafePath(full_path.display().to_string()));
    }
    Ok(Some(resolved))
}

/// Removes staging files (`data/*_data.csv`) and the `target/` report directory.
/// Returns what was removed. Other files under `data/` are left alone.
pub fn clean_workspace(root: &Path) -> Result<Vec<PathBuf>, LoadchainError> {
    info!(root = %root.display(), "Cleaning workspace");
    let root = root.canonicalize()?;
    let mut removed = Vec::new();

    if let Some(data_dir) = contained(&root, STAGING_DIR)? {
        for entry in WalkDir::new(&data_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| LoadchainError::InternalError(e.to_string()))?;
            let is_staging = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(STAGING_SUFFIX));
            if is_staging {
                fs::remove_file(entry.path())?;
                debug!(path = %entry.path().display(), "Staging file removed");
                removed.push(entry.into_path());
            }
        }
    }

    if let Some(target_dir) = contained(&root, REPORT_DIR)? {
        if target_dir.is_dir() {
            fs::remove_dir_all(&target_dir)?;
        } else {
            fs::remove_file(&target_dir)?;
        }
        removed.push(target_dir);
    }

    info!(removed = removed.len(), "Workspace clean");
    Ok(removed)
}
