// loadchain-core/src/domain/graph/compiler.rs

use tracing::{debug, info, instrument};

use crate::domain::error::DomainError;
use crate::domain::graph::dag::{DependencyChain, DependencyGraph};
use crate::domain::graph::unit::{Stage, UnitBuilder, UnitId};
use crate::domain::settings::PipelineSettings;
use crate::domain::table::TableDescriptor;

/// Turns table descriptors into one linear chain of units per table.
pub struct GraphCompiler<'a> {
    settings: &'a PipelineSettings,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(settings: &'a PipelineSettings) -> Self {
        Self { settings }
    }

    /// Chains never share edges: tables run and fail independently.
    #[instrument(skip_all, fields(graph = %self.settings.graph_name, tables = descriptors.len()))]
    pub fn compile(
        &self,
        descriptors: &[TableDescriptor],
    ) -> Result<DependencyGraph, DomainError> {
        let mut graph = DependencyGraph::new(
            self.settings.graph_name.clone(),
            self.settings.retry_policy,
        );

        for descriptor in descriptors {
            let builder = UnitBuilder::new(self.settings, descriptor)?;

            let mut units = Vec::with_capacity(Stage::CHAIN.len());
            let mut previous: Option<UnitId> = None;
            for stage in Stage::CHAIN {
                let unit = builder.build(stage, previous.as_ref());
                previous = Some(unit.id().clone());
                units.push(unit);
            }

            graph.push_chain(DependencyChain::new(descriptor.table_name.clone(), units))?;
            debug!(table = %descriptor.table_name, "Chain compiled");
        }

        info!(
            units = graph.unit_count(),
            chains = graph.chains().len(),
            "Dependency graph compiled"
        );
        Ok(graph)
    }
}
