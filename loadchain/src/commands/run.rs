// loadchain/src/commands/run.rs
//
// USE CASE: Compile the graph and execute every chain in-process.

use std::path::Path;

use anyhow::Context;
use loadchain_core::application::{
    RunOptions, RunReport, UnitExecutor, UnitStatus, compile_graph, run_pipeline,
};
use loadchain_core::domain::naming::run_report_path;
use loadchain_core::infrastructure::factory::{AdapterFactory, WarehouseTarget};
use tracing::info;

use super::settings_from;
use crate::cli::GraphArgs;

pub async fn execute(
    args: GraphArgs,
    warehouse: WarehouseTarget,
    project: Option<String>,
    concurrency: usize,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Settings + graph (fatal before any unit runs)
    println!("⚙️  Loading tables config...");
    let settings = settings_from(&args);
    let graph = compile_graph(&settings, args.config.as_deref(), &args.tables)
        .context("Failed to compile the load graph")?;
    println!(
        "   Graph: {} ({} chain(s), {} unit(s))",
        graph.name(),
        graph.chains().len(),
        graph.unit_count()
    );

    // B. Adapters behind the ports
    let mut factory = AdapterFactory::new().with_default_project(project);
    let source = factory
        .source(&settings.source_connection)
        .context("Unsupported source connection")?;
    let store = factory.store(settings.store);
    let sink = factory
        .warehouse(&warehouse)
        .with_context(|| format!("Failed to open warehouse {}", warehouse))?;
    println!(
        "   Source: {} 🐘  Store: {}://{}  Warehouse: {}",
        source.engine_name(),
        store.scheme(),
        settings.container_location(),
        sink.engine_name()
    );

    // C. Run
    info!(
        write_mode = ?settings.write_mode,
        retries = settings.retry_policy.retries,
        concurrency,
        "Starting run"
    );
    let executor = UnitExecutor::new(source, store, sink);
    let options = RunOptions {
        concurrency,
        ..RunOptions::default()
    };
    let report = run_pipeline(&settings, &graph, &executor, options)
        .await
        .context("Run aborted")?;

    print_summary(&report, &run_report_path(&settings.root_dir));

    if report.success {
        println!("\n✨ SUCCESS! {} unit(s) finished in {:.2?}", report.units.len(), start.elapsed());
    } else {
        eprintln!(
            "\n❌ FAILURE. {} unit(s) failed, {} skipped.",
            report.count(UnitStatus::Failed),
            report.count(UnitStatus::UpstreamFailed)
        );
        // Exit with error code for CI/CD
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(report: &RunReport, report_path: &Path) {
    for unit in &report.units {
        let (icon, detail) = match unit.status {
            UnitStatus::Succeeded => (
                "✅",
                unit.output
                    .as_ref()
                    .map(|o| o.describe())
                    .unwrap_or_default(),
            ),
            UnitStatus::Failed => ("❌", unit.error.clone().unwrap_or_default()),
            UnitStatus::UpstreamFailed => ("⏭️ ", "skipped, upstream failed".to_string()),
        };
        println!("   {} {} [{} attempt(s)] {}", icon, unit.unit, unit.attempts, detail);
    }
    println!("📄 Report: {}", report_path.display());
}
