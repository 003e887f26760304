// loadchain/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).
// Flags win over environment variables; `.env` is loaded before parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use loadchain_core::application::PlanFormat;
use loadchain_core::domain::settings::{RetryPolicy, StoreScheme, WriteMode};
use loadchain_core::infrastructure::factory::WarehouseTarget;

#[derive(Parser)]
#[command(name = "loadchain")]
#[command(about = "Compiles a table list into Postgres -> GCS -> BigQuery load chains and runs them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Gcs,
    Local,
}

impl From<StoreArg> for StoreScheme {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Gcs => StoreScheme::Gcs,
            StoreArg::Local => StoreScheme::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    Truncate,
    Append,
}

impl From<WriteModeArg> for WriteMode {
    fn from(arg: WriteModeArg) -> Self {
        match arg {
            WriteModeArg::Truncate => WriteMode::Truncate,
            WriteModeArg::Append => WriteMode::Append,
        }
    }
}

/// Everything needed to compile the graph.
#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Root working directory (staging files land in <root>/data)
    #[arg(long, env = "LOADCHAIN_HOME", default_value = ".")]
    pub root: PathBuf,

    /// Tables config file (default: config.json / config.yaml under the root)
    #[arg(long, env = "LOADCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source connection string (postgres://... or duckdb://<file>)
    #[arg(long, env = "PG_CONNECTION", hide_env_values = true)]
    pub source: String,

    /// Destination bucket (a directory with --store local)
    #[arg(long, env = "GCS_BUCKET")]
    pub bucket: String,

    /// Object store backend
    #[arg(long, env = "LOADCHAIN_STORE", value_enum, default_value_t = StoreArg::Gcs)]
    pub store: StoreArg,

    /// What the load does with rows already in the destination
    #[arg(long, env = "LOADCHAIN_WRITE_MODE", value_enum, default_value_t = WriteModeArg::Truncate)]
    pub write_mode: WriteModeArg,

    /// Retries per unit after the first attempt
    #[arg(long, env = "LOADCHAIN_RETRIES", default_value_t = 1)]
    pub retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, env = "LOADCHAIN_RETRY_DELAY_SECS", default_value_t = 60)]
    pub retry_delay_secs: u64,

    /// Restrict to these tables (repeatable)
    #[arg(long = "table", short = 't')]
    pub tables: Vec<String>,
}

impl GraphArgs {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay_secs))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🗺️  Compiles the tables config and prints the unit graph
    Plan {
        #[command(flatten)]
        graph: GraphArgs,

        /// Output format: table | mermaid | json
        #[arg(long, default_value_t = PlanFormat::Table)]
        format: PlanFormat,
    },

    /// 🚀 Runs every chain (provision -> extract -> upload -> load)
    Run {
        #[command(flatten)]
        graph: GraphArgs,

        /// Destination warehouse: bigquery | duckdb://<file>
        #[arg(long, env = "LOADCHAIN_WAREHOUSE", default_value_t = WarehouseTarget::BigQuery)]
        warehouse: WarehouseTarget,

        /// Default BigQuery project for dataset.table identifiers
        #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
        project: Option<String>,

        /// Chains executed concurrently
        #[arg(long, env = "LOADCHAIN_CONCURRENCY", default_value_t = 8)]
        concurrency: usize,
    },

    /// 🧹 Removes staging CSVs (data/*_data.csv) and the target/ folder
    Clean {
        #[arg(long, env = "LOADCHAIN_HOME", default_value = ".")]
        root: PathBuf,
    },
}
