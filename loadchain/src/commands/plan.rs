// loadchain/src/commands/plan.rs
//
// USE CASE: Show the compiled graph without touching any external system.

use anyhow::Context;
use loadchain_core::application::{PlanFormat, compile_graph, render_plan};

use super::settings_from;
use crate::cli::GraphArgs;

pub fn execute(args: GraphArgs, format: PlanFormat) -> anyhow::Result<()> {
    let settings = settings_from(&args);
    let graph = compile_graph(&settings, args.config.as_deref(), &args.tables)
        .context("Failed to compile the load graph")?;

    if format == PlanFormat::Table {
        println!(
            "🗺️  {}: {} chain(s), {} unit(s)",
            graph.name(),
            graph.chains().len(),
            graph.unit_count()
        );
    }
    println!("{}", render_plan(&graph, format)?);
    Ok(())
}
