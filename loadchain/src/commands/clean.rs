// loadchain/src/commands/clean.rs
//
// USE CASE: Remove staging files and run reports.

use std::path::PathBuf;

use anyhow::Context;
use loadchain_core::application::clean_workspace;

pub fn execute(root: PathBuf) -> anyhow::Result<()> {
    let removed = clean_workspace(&root)
        .with_context(|| format!("Failed to clean {}", root.display()))?;

    if removed.is_empty() {
        println!("✨ Nothing to clean in {}", root.display());
    } else {
        for path in &removed {
            println!("   🗑️  {}", path.display());
        }
        println!("🧹 Removed {} item(s).", removed.len());
    }
    Ok(())
}
