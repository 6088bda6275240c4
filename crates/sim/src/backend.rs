//! The simulated store and its fault controls

use crate::fault::{BreakMode, Faults};
use crate::link::{SimConfirmation, SimConnector};
use continuity_core::{Endpoint, LinkError, OperationId, OperationRequest, Value};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A stored row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Non-key columns
    pub values: Vec<Value>,
    /// Statements that wrote this row
    pub writes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BackendState {
    pub(crate) rows: BTreeMap<i64, Row>,
    pub(crate) counters: BTreeMap<String, i64>,
    /// Commit record queried by [`SimConfirmation`]
    pub(crate) committed: HashSet<OperationId>,
    /// Bumped on switchover; links from older generations are dead
    pub(crate) generation: u64,
    pub(crate) faults: Faults,
    pub(crate) opens: u64,
    pub(crate) executions: u64,
    pub(crate) confirmation_unavailable: bool,
    pub(crate) opened_endpoints: Vec<Endpoint>,
}

/// What happened to one execution
pub(crate) enum Executed {
    Applied(Result<u64, LinkError>),
    /// Link lost; `applied` tells whether the statement committed first
    LinkLost { applied: bool },
}

impl BackendState {
    pub(crate) fn execute(&mut self, request: &OperationRequest<'_>) -> Executed {
        self.executions += 1;
        let fault = self.faults.take_break(self.executions);

        if fault == Some(BreakMode::BeforeApply) {
            debug!(operation = %request.id, execution = self.executions, "injected break before apply");
            return Executed::LinkLost { applied: false };
        }

        let result = self.apply(request.statement, request.parameters);
        if result.is_ok() {
            self.committed.insert(request.id);
        }

        if fault == Some(BreakMode::AfterApply) {
            debug!(operation = %request.id, execution = self.executions, "injected break after apply");
            return Executed::LinkLost {
                applied: result.is_ok(),
            };
        }
        Executed::Applied(result)
    }

    fn apply(&mut self, statement: &str, parameters: &[Value]) -> Result<u64, LinkError> {
        let verb = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        match verb.as_str() {
            "MERGE" => {
                let (key, values) = keyed(parameters)?;
                if self.rows.contains_key(&key) {
                    return Ok(0);
                }
                self.rows.insert(key, Row { values, writes: 1 });
                Ok(1)
            }
            "INSERT" => {
                let (key, values) = keyed(parameters)?;
                if self.rows.contains_key(&key) {
                    return Err(LinkError::statement(format!(
                        "unique constraint violated for key {}",
                        key
                    )));
                }
                self.rows.insert(key, Row { values, writes: 1 });
                Ok(1)
            }
            "UPDATE" => {
                let name = parameters
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| LinkError::statement("UPDATE needs a counter name"))?;
                let delta = match parameters.get(1) {
                    None => 1,
                    Some(v) => v
                        .as_i64()
                        .ok_or_else(|| LinkError::statement("UPDATE delta must be an integer"))?,
                };
                *self.counters.entry(name.to_string()).or_insert(0) += delta;
                Ok(1)
            }
            "DELETE" => {
                let (key, _) = keyed(parameters)?;
                Ok(self.rows.remove(&key).map_or(0, |_| 1))
            }
            other => Err(LinkError::statement(format!(
                "unsupported statement '{}'",
                other
            ))),
        }
    }
}

fn keyed(parameters: &[Value]) -> Result<(i64, Vec<Value>), LinkError> {
    let key = parameters
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| LinkError::statement("first parameter must be an integer key"))?;
    Ok((key, parameters[1..].to_vec()))
}

/// Shared handle to a simulated backend
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    pub(crate) inner: Arc<Mutex<BackendState>>,
}

impl SimBackend {
    /// Empty backend with no faults armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector opening links to this backend
    pub fn connector(&self) -> SimConnector {
        SimConnector::new(self.clone())
    }

    /// Commit confirmation backed by this backend's commit record
    pub fn confirmation(&self) -> SimConfirmation {
        SimConfirmation::new(self.clone())
    }

    // ========================================================================
    // Faults
    // ========================================================================

    /// Role change: every currently open link breaks on its next use
    pub fn switchover(&self) {
        let mut state = self.inner.lock();
        state.generation += 1;
        debug!(generation = state.generation, "switchover");
    }

    /// Refuse the next `n` link acquisitions
    pub fn fail_next_opens(&self, n: u32) {
        self.inner.lock().faults.failing_opens = n;
    }

    /// Refuse (or stop refusing) acquisitions against `host`
    pub fn set_endpoint_down(&self, host: &str, down: bool) {
        let mut state = self.inner.lock();
        if down {
            state.faults.down_hosts.insert(host.to_string());
        } else {
            state.faults.down_hosts.remove(host);
        }
    }

    /// Break the link on the next execution
    pub fn break_next_execute(&self, mode: BreakMode) {
        let mut state = self.inner.lock();
        let next = state.executions + 1;
        state.faults.breaks.insert(next, mode);
    }

    /// Break the link on the `nth` execution (1-based, counted since creation)
    pub fn break_execution(&self, nth: u64, mode: BreakMode) {
        self.inner.lock().faults.breaks.insert(nth, mode);
    }

    /// Make commit confirmation queries succeed or fail
    pub fn set_confirmation_available(&self, available: bool) {
        self.inner.lock().confirmation_unavailable = !available;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Snapshot of all rows
    pub fn rows(&self) -> BTreeMap<i64, Row> {
        self.inner.lock().rows.clone()
    }

    /// One row
    pub fn row(&self, key: i64) -> Option<Row> {
        self.inner.lock().rows.get(&key).cloned()
    }

    /// Counter value (0 if never updated)
    pub fn counter(&self, name: &str) -> i64 {
        self.inner.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Whether the store committed the given operation
    pub fn has_committed(&self, id: &OperationId) -> bool {
        self.inner.lock().committed.contains(id)
    }

    /// Successful link acquisitions
    pub fn open_count(&self) -> u64 {
        self.inner.lock().opens
    }

    /// Statement executions that reached the backend
    pub fn execution_count(&self) -> u64 {
        self.inner.lock().executions
    }

    /// Endpoints of successful acquisitions, in order
    pub fn opened_endpoints(&self) -> Vec<Endpoint> {
        self.inner.lock().opened_endpoints.clone()
    }
}
