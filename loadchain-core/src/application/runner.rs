// loadchain-core/src/application/runner.rs
//
// In-process execution of a compiled graph. Chains run concurrently, units of a
// chain run one after the other, each unit gets `retries + 1` attempts.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::events::{EventSink, FanoutSink, MemorySink, RunEvent, TracingSink};
use crate::application::executor::{UnitExecutor, UnitOutput};
use crate::domain::graph::{DependencyChain, DependencyGraph, Stage, UnitId, UnitOfWork};
use crate::domain::settings::RetryPolicy;
use crate::error::LoadchainError;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Succeeded,
    Failed,
    UpstreamFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub unit: UnitId,
    pub table_name: String,
    pub stage: Stage,
    pub status: UnitStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<UnitOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub graph: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In graph declaration order.
    pub units: Vec<UnitReport>,
    pub events: Vec<RunEvent>,
}

impl RunReport {
    pub fn unit(&self, id: &UnitId) -> Option<&UnitReport> {
        self.units.iter().find(|u| &u.unit == id)
    }

    pub fn count(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|u| u.status == status).count()
    }

    /// Writes the report as pretty JSON, atomically.
    pub fn save(&self, path: &Path) -> Result<(), LoadchainError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LoadchainError::InternalError(format!("Serialization: {}", e)))?;
        crate::infrastructure::fs::atomic_write(path, content)?;
        Ok(())
    }
}

pub struct LocalRunner<'a> {
    executor: &'a UnitExecutor,
    concurrency: usize,
    sink: Arc<dyn EventSink>,
}

impl<'a> LocalRunner<'a> {
    pub fn new(executor: &'a UnitExecutor) -> Self {
        Self {
            executor,
            concurrency: DEFAULT_CONCURRENCY,
            sink: Arc::new(TracingSink),
        }
    }

    /// Maximum number of chains in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[instrument(skip_all, fields(graph = graph.name(), chains = graph.chains().len()))]
    pub async fn run(&self, graph: &DependencyGraph) -> RunReport {
        let started_at = Utc::now();
        let memory = Arc::new(MemorySink::default());
        let sink = FanoutSink::new(vec![self.sink.clone(), memory.clone()]);
        let policy = graph.retry_policy();

        info!(units = graph.unit_count(), concurrency = self.concurrency, "Run started");

        let chains = graph
            .chains()
            .iter()
            .map(|chain| self.run_chain(chain, policy, &sink));
        let per_chain: Vec<Vec<UnitReport>> = futures::stream::iter(chains)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Chains finish in any order; reports follow declaration order.
        let position: HashMap<&UnitId, usize> =
            graph.units().enumerate().map(|(i, u)| (u.id(), i)).collect();
        let mut units: Vec<UnitReport> = per_chain.into_iter().flatten().collect();
        units.sort_by_key(|u| position.get(&u.unit).copied().unwrap_or(usize::MAX));

        let success = units.iter().all(|u| u.status == UnitStatus::Succeeded);
        let report = RunReport {
            graph: graph.name().to_string(),
            success,
            started_at,
            finished_at: Utc::now(),
            units,
            events: memory.events(),
        };

        info!(
            success,
            succeeded = report.count(UnitStatus::Succeeded),
            failed = report.count(UnitStatus::Failed),
            skipped = report.count(UnitStatus::UpstreamFailed),
            "Run finished"
        );
        report
    }

    async fn run_chain(
        &self,
        chain: &DependencyChain,
        policy: RetryPolicy,
        sink: &dyn EventSink,
    ) -> Vec<UnitReport> {
        let mut succeeded: HashSet<UnitId> = HashSet::new();
        let mut reports = Vec::with_capacity(chain.units().len());

        for unit in chain.units() {
            let blocker = unit.upstream().iter().find(|up| !succeeded.contains(*up));
            if let Some(blocked_by) = blocker {
                sink.emit(&RunEvent::UnitSkipped {
                    unit: unit.id().clone(),
                    blocked_by: blocked_by.clone(),
                    at: Utc::now(),
                });
                reports.push(UnitReport {
                    unit: unit.id().clone(),
                    table_name: unit.table_name().to_string(),
                    stage: unit.stage(),
                    status: UnitStatus::UpstreamFailed,
                    attempts: 0,
                    output: None,
                    error: None,
                });
                continue;
            }

            let report = self.run_unit(unit, policy, sink).await;
            if report.status == UnitStatus::Succeeded {
                succeeded.insert(unit.id().clone());
            }
            reports.push(report);
        }
        reports
    }

    async fn run_unit(
        &self,
        unit: &UnitOfWork,
        policy: RetryPolicy,
        sink: &dyn EventSink,
    ) -> UnitReport {
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            sink.emit(&RunEvent::UnitStarted {
                unit: unit.id().clone(),
                attempt,
                at: Utc::now(),
            });

            let (status, output, error) = match self.executor.execute(unit).await {
                Ok(output) => {
                    sink.emit(&RunEvent::UnitSucceeded {
                        unit: unit.id().clone(),
                        attempt,
                        detail: output.describe(),
                        at: Utc::now(),
                    });
                    (UnitStatus::Succeeded, Some(output), None)
                }
                Err(e) if attempt < max_attempts => {
                    sink.emit(&RunEvent::UnitRetrying {
                        unit: unit.id().clone(),
                        attempt,
                        error: e.to_string(),
                        delay_ms: u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                        at: Utc::now(),
                    });
                    tokio::time::sleep(policy.delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    sink.emit(&RunEvent::UnitFailed {
                        unit: unit.id().clone(),
                        attempts: attempt,
                        error: e.to_string(),
                        at: Utc::now(),
                    });
                    (UnitStatus::Failed, None, Some(e.to_string()))
                }
            };

            return UnitReport {
                unit: unit.id().clone(),
                table_name: unit.table_name().to_string(),
                stage: unit.stage(),
                status,
                attempts: attempt,
                output,
                error,
            };
        }
    }
}
