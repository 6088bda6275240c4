//! State shared between a session handle and its worker
//!
//! One mutex guards the session state, the replay log and the resolved
//! outcome table together, so a state change and the log change that goes
//! with it are always observed as one step.

use crate::metrics::{ContinuityCounters, CounterEvent};
use crate::state::SessionState;
use continuity_core::{Completion, FailureReason, Outcome, SessionId};
use continuity_durability::{LogError, ReplayLog};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// How an operation ends
#[derive(Debug, Clone)]
pub(crate) enum Resolution {
    Committed { rows_affected: Option<u64> },
    Failed(FailureReason),
    Unknown,
}

pub(crate) struct SessionShared {
    pub(crate) core: Mutex<SessionCore>,
    /// Signalled on every submission, resolution and state change
    pub(crate) changed: Condvar,
    pub(crate) counters: ContinuityCounters,
}

impl SessionShared {
    pub(crate) fn new(core: SessionCore) -> Self {
        Self {
            core: Mutex::new(core),
            changed: Condvar::new(),
            counters: ContinuityCounters::new(),
        }
    }
}

pub(crate) struct SessionCore {
    pub(crate) id: SessionId,
    pub(crate) state: SessionState,
    pub(crate) log: ReplayLog,
    /// Highest committed sequence
    pub(crate) last_committed: u64,
    /// Sequences a live ticket is interested in
    pub(crate) waiting: HashSet<u64>,
    /// Terminal outcomes held until their ticket is dropped
    pub(crate) resolved: HashMap<u64, Completion>,
}

impl SessionCore {
    pub(crate) fn new(id: SessionId, log: ReplayLog) -> Self {
        Self {
            id,
            // The first link is acquired like any replacement
            state: SessionState::Reconnecting,
            log,
            last_committed: 0,
            waiting: HashSet::new(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        match next {
            SessionState::Active | SessionState::Closed => {
                info!(session = %self.id, from = %self.state, to = %next, "session state changed")
            }
            _ => debug!(session = %self.id, from = %self.state, to = %next, "session state changed"),
        }
        self.state = next;
    }

    /// Resolve a pending operation and publish its completion
    ///
    /// Returns false if the operation was not pending.
    pub(crate) fn resolve(
        &mut self,
        sequence: u64,
        resolution: Resolution,
        counters: &ContinuityCounters,
    ) -> bool {
        let attempts = match self.log.get(sequence) {
            Some(entry) if !entry.is_terminal() => entry.dispatch_count,
            _ => return false,
        };

        let (outcome, failure, rows_affected, result) = match resolution {
            Resolution::Committed { rows_affected } => (
                Outcome::Committed,
                None,
                rows_affected,
                self.log.mark_committed(sequence),
            ),
            Resolution::Failed(reason) => (
                Outcome::Failed,
                Some(reason.clone()),
                None,
                self.log.mark_failed(sequence, reason),
            ),
            Resolution::Unknown => (Outcome::Unknown, None, None, self.log.mark_unknown(sequence)),
        };

        match result {
            Ok(()) => {}
            Err(LogError::Journal(err)) => {
                warn!(session = %self.id, sequence, error = %err, "failed to journal outcome");
            }
            Err(err) => {
                warn!(session = %self.id, sequence, error = %err, "failed to resolve operation");
                return false;
            }
        }

        let event = match outcome {
            Outcome::Committed => {
                self.last_committed = self.last_committed.max(sequence);
                CounterEvent::Committed
            }
            Outcome::Failed => CounterEvent::Failed,
            _ => CounterEvent::Unknown,
        };
        counters.record(event);
        debug!(session = %self.id, sequence, outcome = %outcome, attempts, "operation resolved");

        if self.waiting.contains(&sequence) {
            self.resolved.insert(
                sequence,
                Completion {
                    sequence,
                    outcome,
                    failure,
                    rows_affected,
                    attempts,
                },
            );
        }
        true
    }

    /// Pending operations as `(sequence, dispatched)`, in submission order
    pub(crate) fn pending(&self) -> Vec<(u64, bool)> {
        self.log
            .pending_since(self.log.checkpoint())
            .map(|e| (e.sequence, e.is_dispatched()))
            .collect()
    }

    /// Outcome of a tracked operation, if known
    pub(crate) fn outcome(&self, sequence: u64) -> Option<Outcome> {
        if let Some(entry) = self.log.get(sequence) {
            return Some(entry.outcome);
        }
        self.resolved.get(&sequence).map(|c| c.outcome)
    }
}
