// loadchain/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, LogFormat};

fn init_tracing(format: LogFormat) {
    // RUST_LOG=debug loadchain run ... to see per-unit details
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; flags and the real environment still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Plan { graph, format } => commands::plan::execute(graph, format)?,
        Commands::Run {
            graph,
            warehouse,
            project,
            concurrency,
        } => commands::run::execute(graph, warehouse, project, concurrency).await?,
        Commands::Clean { root } => commands::clean::execute(root)?,
    }

    Ok(())
}
