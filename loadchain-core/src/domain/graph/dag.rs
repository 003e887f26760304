// loadchain-core/src/domain/graph/dag.rs

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::error::DomainError;
use crate::domain::graph::unit::{Stage, UnitId, UnitOfWork};
use crate::domain::settings::RetryPolicy;

/// The four units of one table, linked Provision -> Extract -> Upload -> Load.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyChain {
    table_name: String,
    units: Vec<UnitOfWork>,
}

impl DependencyChain {
    pub(crate) fn new(table_name: String, units: Vec<UnitOfWork>) -> Self {
        Self { table_name, units }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn units(&self) -> &[UnitOfWork] {
        &self.units
    }

    pub fn edges(&self) -> Vec<(&UnitId, &UnitId)> {
        self.units
            .iter()
            .flat_map(|unit| unit.upstream().iter().map(move |up| (up, unit.id())))
            .collect()
    }

    /// Strictly linear: stages in chain order, each unit waiting on exactly the previous one.
    pub fn verify_linear(&self) -> Result<(), DomainError> {
        let broken = |reason: String| DomainError::BrokenChain {
            table_name: self.table_name.clone(),
            reason,
        };

        let stages: Vec<Stage> = self.units.iter().map(|u| u.stage()).collect();
        if stages != Stage::CHAIN {
            return Err(broken(format!("unexpected stage order {:?}", stages)));
        }

        let mut previous: Option<&UnitId> = None;
        for unit in &self.units {
            if unit.table_name() != self.table_name {
                return Err(broken(format!(
                    "unit {} belongs to '{}'",
                    unit.id(),
                    unit.table_name()
                )));
            }
            let expected: Vec<&UnitId> = previous.into_iter().collect();
            let actual: Vec<&UnitId> = unit.upstream().iter().collect();
            if actual != expected {
                return Err(broken(format!(
                    "unit {} waits on {:?}, expected {:?}",
                    unit.id(),
                    actual,
                    expected
                )));
            }
            previous = Some(unit.id());
        }
        Ok(())
    }
}

/// Units of work for every table, addressed by id.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    name: String,
    retry_policy: RetryPolicy,
    chains: Vec<DependencyChain>,

    #[serde(skip)]
    index: HashMap<UnitId, (usize, usize)>,
}

impl DependencyGraph {
    pub fn new(name: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            retry_policy,
            chains: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a chain, rejecting any unit id already present in the graph.
    pub(crate) fn push_chain(&mut self, chain: DependencyChain) -> Result<(), DomainError> {
        let mut fresh = HashSet::new();
        for unit in chain.units() {
            if self.index.contains_key(unit.id()) || !fresh.insert(unit.id()) {
                return Err(DomainError::DuplicateUnit {
                    id: unit.id().to_string(),
                    table_name: unit.table_name().to_string(),
                });
            }
        }

        let chain_idx = self.chains.len();
        for (unit_idx, unit) in chain.units().iter().enumerate() {
            self.index.insert(unit.id().clone(), (chain_idx, unit_idx));
        }
        self.chains.push(chain);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn chains(&self) -> &[DependencyChain] {
        &self.chains
    }

    pub fn chain(&self, table_name: &str) -> Option<&DependencyChain> {
        self.chains.iter().find(|c| c.table_name() == table_name)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitOfWork> {
        self.chains.iter().flat_map(|c| c.units().iter())
    }

    pub fn unit_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, id: &UnitId) -> Option<&UnitOfWork> {
        let (chain_idx, unit_idx) = *self.index.get(id)?;
        self.chains.get(chain_idx)?.units().get(unit_idx)
    }

    pub fn edges(&self) -> Vec<(&UnitId, &UnitId)> {
        self.chains.iter().flat_map(|c| c.edges()).collect()
    }

    /// Sub-graph restricted to the given tables, keeping the original chain order.
    pub fn select(&self, tables: &[String]) -> Result<DependencyGraph, DomainError> {
        for table in tables {
            if self.chain(table).is_none() {
                return Err(DomainError::UnknownTable(table.clone()));
            }
        }

        let mut selected = DependencyGraph::new(self.name.clone(), self.retry_policy);
        for chain in &self.chains {
            if tables.iter().any(|t| t == chain.table_name()) {
                selected.push_chain(chain.clone())?;
            }
        }
        Ok(selected)
    }

    /// Checks every chain is linear and no edge crosses chains.
    pub fn verify(&self) -> Result<(), DomainError> {
        for chain in &self.chains {
            chain.verify_linear()?;
        }
        for (from, to) in self.edges() {
            let from_chain = self.index.get(from).map(|(c, _)| *c);
            let to_chain = self.index.get(to).map(|(c, _)| *c);
            if from_chain.is_none() || from_chain != to_chain {
                let table_name = self
                    .get(to)
                    .map(|u| u.table_name().to_string())
                    .unwrap_or_default();
                return Err(DomainError::BrokenChain {
                    table_name,
                    reason: format!("edge {} -> {} leaves the chain", from, to),
                });
            }
        }
        Ok(())
    }

    /// Groups units into layers (Kahn's algorithm).
    /// Layer N only depends on layers 0..N-1, so a layer's units may run in parallel.
    pub fn execution_layers(&self) -> Vec<Vec<UnitId>> {
        let mut in_degree: HashMap<&UnitId, usize> = HashMap::new();
        let mut downstream: HashMap<&UnitId, Vec<&UnitId>> = HashMap::new();

        // Iterating in declaration order keeps layers deterministic.
        let mut queue: VecDeque<&UnitId> = VecDeque::new();
        for unit in self.units() {
            let known_upstream = unit
                .upstream()
                .iter()
                .filter(|up| self.index.contains_key(*up))
                .count();
            in_degree.insert(unit.id(), known_upstream);
            for up in unit.upstream() {
                downstream.entry(up).or_default().push(unit.id());
            }
            if known_upstream == 0 {
                queue.push_back(unit.id());
            }
        }

        let mut layers = Vec::new();
        while !queue.is_empty() {
            let layer_size = queue.len();
            let mut current_layer = Vec::with_capacity(layer_size);

            for _ in 0..layer_size {
                let Some(current) = queue.pop_front() else {
                    break;
                };
                current_layer.push(current.clone());

                for next in downstream.get(current).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(*next) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*next);
                        }
                    }
                }
            }
            layers.push(current_layer);
        }

        layers
    }
}
