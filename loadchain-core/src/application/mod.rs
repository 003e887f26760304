// loadchain-core/src/application/mod.rs

pub mod clean;
pub mod events;
pub mod executor;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod stages;

#[cfg(test)]
mod testing;

// --- RE-EXPORTS (FACADE) ---
// The CLI only needs `use loadchain_core::application::{...}`.

pub use clean::clean_workspace;
pub use events::{EventSink, FanoutSink, MemorySink, RunEvent, TracingSink};
pub use executor::{UnitExecutor, UnitOutput};
pub use pipeline::{RunOptions, compile_graph, run_pipeline};
pub use plan::{PlanFormat, render_plan};
pub use runner::{LocalRunner, RunReport, UnitReport, UnitStatus};
pub use stages::StagingArtifact;
