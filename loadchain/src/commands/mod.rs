// loadchain/src/commands/mod.rs

pub mod clean;
pub mod plan;
pub mod run;

use loadchain_core::domain::settings::{ConnectionString, PipelineSettings};

use crate::cli::GraphArgs;

/// Resolves the immutable settings every unit shares.
pub fn settings_from(args: &GraphArgs) -> PipelineSettings {
    PipelineSettings::new(
        args.root.clone(),
        ConnectionString::new(args.source.clone()),
        args.bucket.clone(),
    )
    .with_store(args.store.into())
    .with_write_mode(args.write_mode.into())
    .with_retry_policy(args.retry_policy())
}
