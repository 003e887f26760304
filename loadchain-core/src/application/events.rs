// loadchain-core/src/application/events.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::domain::graph::UnitId;

/// Lifecycle transition of a unit during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    UnitStarted {
        unit: UnitId,
        attempt: u32,
        at: DateTime<Utc>,
    },
    UnitSucceeded {
        unit: UnitId,
        attempt: u32,
        detail: String,
        at: DateTime<Utc>,
    },
    UnitRetrying {
        unit: UnitId,
        attempt: u32,
        error: String,
        delay_ms: u64,
        at: DateTime<Utc>,
    },
    UnitFailed {
        unit: UnitId,
        attempts: u32,
        error: String,
        at: DateTime<Utc>,
    },
    UnitSkipped {
        unit: UnitId,
        blocked_by: UnitId,
        at: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn unit(&self) -> &UnitId {
        match self {
            RunEvent::UnitStarted { unit, .. }
            | RunEvent::UnitSucceeded { unit, .. }
            | RunEvent::UnitRetrying { unit, .. }
            | RunEvent::UnitFailed { unit, .. }
            | RunEvent::UnitSkipped { unit, .. } => unit,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::UnitStarted { .. } => "started",
            RunEvent::UnitSucceeded { .. } => "succeeded",
            RunEvent::UnitRetrying { .. } => "retrying",
            RunEvent::UnitFailed { .. } => "failed",
            RunEvent::UnitSkipped { .. } => "skipped",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::UnitStarted { unit, attempt, .. } => {
                info!(unit = %unit, attempt, "Unit started")
            }
            RunEvent::UnitSucceeded {
                unit,
                attempt,
                detail,
                ..
            } => info!(unit = %unit, attempt, %detail, "Unit succeeded"),
            RunEvent::UnitRetrying {
                unit,
                attempt,
                error,
                delay_ms,
                ..
            } => warn!(unit = %unit, attempt, %error, delay_ms, "Unit failed, retrying"),
            RunEvent::UnitFailed {
                unit,
                attempts,
                error,
                ..
            } => error!(unit = %unit, attempts, %error, "Unit failed"),
            RunEvent::UnitSkipped {
                unit, blocked_by, ..
            } => warn!(unit = %unit, blocked_by = %blocked_by, "Unit skipped"),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<RunEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &RunEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
