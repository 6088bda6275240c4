//! Session manager
//!
//! Runs on the session's worker thread and exclusively owns the physical
//! link. Link I/O always happens outside the session lock.
//!
//! # Replay
//!
//! After a replacement link is acquired, every PENDING operation that had
//! already been dispatched is handled in submission order:
//!
//! | Class | Action |
//! |-------|--------|
//! | IDEMPOTENT | re-execute |
//! | AT_MOST_ONCE | ask the confirmation collaborator; committed -> COMMITTED, not committed -> re-execute, unavailable -> as UNSAFE |
//! | UNSAFE | resolve UNKNOWN, never re-execute |
//!
//! Operations that were queued but never dispatched are not replayed; they
//! are sent for the first time once the session is ACTIVE again.
//! A statement error during replay fails only that operation.

use crate::backoff::Backoff;
use crate::handle::Collaborators;
use crate::metrics::CounterEvent;
use crate::shared::{Resolution, SessionShared};
use crate::state::SessionState;
use continuity_core::{
    FailureReason, IdempotencyClass, LinkError, OperationId, OperationRequest, PhysicalLink,
    ReconnectPolicy, SessionId, Value,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Work picked by the worker loop
enum Work {
    Recover,
    Dispatch(Dispatch),
    Shutdown,
}

/// Owned copy of an operation taken out from under the lock
struct Dispatch {
    sequence: u64,
    class: IdempotencyClass,
    statement: String,
    parameters: Vec<Value>,
}

enum ReplayResult {
    Complete,
    LinkLost(String),
    Closed,
}

pub(crate) struct SessionManager {
    id: SessionId,
    shared: Arc<SessionShared>,
    link: Option<Box<dyn PhysicalLink>>,
    collaborators: Collaborators,
    policy: ReconnectPolicy,
    backoff: Backoff,
}

impl SessionManager {
    pub(crate) fn new(
        id: SessionId,
        shared: Arc<SessionShared>,
        collaborators: Collaborators,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            id,
            shared,
            link: None,
            collaborators,
            backoff: Backoff::new(&policy),
            policy,
        }
    }

    /// Worker loop; returns once the session is closed
    pub(crate) fn run(mut self) {
        loop {
            match self.next_work() {
                Work::Shutdown => break,
                Work::Recover => self.recover(),
                Work::Dispatch(dispatch) => self.dispatch(dispatch),
            }
        }
        self.shutdown();
    }

    fn next_work(&self) -> Work {
        let mut core = self.shared.core.lock();
        loop {
            match core.state {
                SessionState::Closed => return Work::Shutdown,
                SessionState::Disrupted | SessionState::Reconnecting => return Work::Recover,
                SessionState::Active if self.link.is_none() => {
                    core.transition(SessionState::Disrupted);
                    return Work::Recover;
                }
                SessionState::Active => {}
            }

            let next = core.log.next_undispatched().map(|e| Dispatch {
                sequence: e.sequence,
                class: e.class(),
                statement: e.operation.statement.clone(),
                parameters: e.operation.parameters.clone(),
            });
            if let Some(dispatch) = next {
                if let Err(err) = core.log.mark_dispatched(dispatch.sequence) {
                    warn!(session = %self.id, sequence = dispatch.sequence, error = %err, "failed to mark dispatch");
                }
                return Work::Dispatch(dispatch);
            }

            self.shared.changed.wait(&mut core);
        }
    }

    // ========================================================================
    // Normal operation
    // ========================================================================

    fn dispatch(&mut self, dispatch: Dispatch) {
        let sequence = dispatch.sequence;
        let result = self.execute(&dispatch);

        let mut core = self.shared.core.lock();
        match result {
            Ok(rows_affected) => {
                debug!(session = %self.id, sequence, rows_affected, "operation committed");
                core.resolve(
                    sequence,
                    Resolution::Committed {
                        rows_affected: Some(rows_affected),
                    },
                    &self.shared.counters,
                );
            }
            Err(LinkError::Statement { reason }) => {
                debug!(session = %self.id, sequence, %reason, "statement rejected");
                core.resolve(
                    sequence,
                    Resolution::Failed(FailureReason::Statement { reason }),
                    &self.shared.counters,
                );
            }
            Err(err) => {
                warn!(session = %self.id, sequence, class = %dispatch.class, error = %err, "link failed during operation");
                self.shared.counters.record(CounterEvent::Disruption);
                if core.state.is_closed() {
                    // No replay after close; the effect is ambiguous
                    core.resolve(sequence, Resolution::Unknown, &self.shared.counters);
                } else {
                    core.transition(SessionState::Disrupted);
                }
            }
        }
        drop(core);
        self.shared.changed.notify_all();
    }

    fn execute(&mut self, dispatch: &Dispatch) -> Result<u64, LinkError> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| LinkError::broken("no link"))?;
        let request = OperationRequest {
            id: OperationId::new(self.id, dispatch.sequence),
            statement: &dispatch.statement,
            parameters: &dispatch.parameters,
        };
        link.execute(&request).map(|r| r.rows_affected)
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Acquire a replacement link and replay in-flight operations
    ///
    /// Returns with the session ACTIVE or CLOSED.
    fn recover(&mut self) {
        self.backoff.reset();
        let mut attempts: u32 = 0;

        loop {
            {
                let mut core = self.shared.core.lock();
                if core.state.is_closed() {
                    return;
                }
                core.transition(SessionState::Reconnecting);
            }
            if let Some(mut old) = self.link.take() {
                old.close();
            }

            attempts += 1;
            let endpoint = self.collaborators.resolver.next_endpoint(attempts);
            let failure = match self.collaborators.connector.open(&endpoint) {
                Ok(link) => {
                    info!(session = %self.id, endpoint = %endpoint, attempt = attempts, "link acquired");
                    self.shared.counters.record(CounterEvent::LinkAcquired);
                    self.link = Some(link);

                    match self.replay() {
                        ReplayResult::Complete => {
                            let mut core = self.shared.core.lock();
                            if !core.state.is_closed() {
                                core.transition(SessionState::Active);
                            }
                            drop(core);
                            self.shared.changed.notify_all();
                            return;
                        }
                        ReplayResult::Closed => return,
                        ReplayResult::LinkLost(reason) => reason,
                    }
                }
                Err(err) => {
                    self.shared.counters.record(CounterEvent::AcquisitionFailure);
                    err.to_string()
                }
            };

            warn!(
                session = %self.id,
                endpoint = %endpoint,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                error = %failure,
                "link acquisition failed"
            );
            if attempts >= self.policy.max_attempts {
                self.exhaust(attempts);
                return;
            }

            let delay = self.backoff.next_delay();
            let deadline = Instant::now().checked_add(delay);
            let mut core = self.shared.core.lock();
            if core.state.is_closed() {
                return;
            }
            core.transition(SessionState::Disrupted);
            debug!(session = %self.id, delay_ms = delay.as_millis() as u64, "backing off");
            // Submissions also signal the condvar; only close or the deadline end the wait
            while !core.state.is_closed() {
                match deadline {
                    Some(deadline) => {
                        if self
                            .shared
                            .changed
                            .wait_until(&mut core, deadline)
                            .timed_out()
                        {
                            break;
                        }
                    }
                    None => self.shared.changed.wait(&mut core),
                }
            }
            if core.state.is_closed() {
                return;
            }
        }
    }

    fn replay(&mut self) -> ReplayResult {
        let in_flight: Vec<Dispatch> = {
            let core = self.shared.core.lock();
            core.log
                .pending_since(core.log.checkpoint())
                .filter(|e| e.is_dispatched())
                .map(|e| Dispatch {
                    sequence: e.sequence,
                    class: e.class(),
                    statement: e.operation.statement.clone(),
                    parameters: e.operation.parameters.clone(),
                })
                .collect()
        };
        if !in_flight.is_empty() {
            info!(session = %self.id, operations = in_flight.len(), "replaying in-flight operations");
        }

        for dispatch in in_flight {
            {
                let core = self.shared.core.lock();
                if core.state.is_closed() {
                    return ReplayResult::Closed;
                }
                let still_pending = core
                    .log
                    .get(dispatch.sequence)
                    .map(|e| !e.is_terminal())
                    .unwrap_or(false);
                if !still_pending {
                    continue;
                }
            }

            let replayed = match dispatch.class {
                IdempotencyClass::Idempotent => self.reexecute(&dispatch),
                IdempotencyClass::AtMostOnce => self.replay_at_most_once(&dispatch),
                IdempotencyClass::Unsafe => {
                    self.resolve_unknown(&dispatch, "unsafe operation interrupted in flight");
                    Ok(())
                }
            };
            if let Err(reason) = replayed {
                return ReplayResult::LinkLost(reason);
            }
        }
        ReplayResult::Complete
    }

    fn replay_at_most_once(&mut self, dispatch: &Dispatch) -> Result<(), String> {
        let Some(confirmation) = self.collaborators.confirmation.clone() else {
            self.resolve_unknown(dispatch, "no commit confirmation for at-most-once operation");
            return Ok(());
        };

        let id = OperationId::new(self.id, dispatch.sequence);
        match confirmation.was_committed(&id) {
            Ok(true) => {
                debug!(session = %self.id, sequence = dispatch.sequence, "confirmed committed, not replayed");
                let mut core = self.shared.core.lock();
                core.resolve(
                    dispatch.sequence,
                    Resolution::Committed {
                        rows_affected: None,
                    },
                    &self.shared.counters,
                );
                drop(core);
                self.shared.changed.notify_all();
                Ok(())
            }
            Ok(false) => self.reexecute(dispatch),
            Err(err) => {
                warn!(session = %self.id, sequence = dispatch.sequence, error = %err, "degrading at-most-once operation to unsafe");
                self.resolve_unknown(dispatch, "commit confirmation unavailable");
                Ok(())
            }
        }
    }

    fn reexecute(&mut self, dispatch: &Dispatch) -> Result<(), String> {
        {
            let mut core = self.shared.core.lock();
            if let Err(err) = core.log.mark_dispatched(dispatch.sequence) {
                warn!(session = %self.id, sequence = dispatch.sequence, error = %err, "failed to mark dispatch");
            }
        }
        self.shared.counters.record(CounterEvent::Replayed);

        let result = self.execute(dispatch);
        let mut core = self.shared.core.lock();
        let outcome = match result {
            Ok(rows_affected) => {
                debug!(session = %self.id, sequence = dispatch.sequence, "replayed operation committed");
                core.resolve(
                    dispatch.sequence,
                    Resolution::Committed {
                        rows_affected: Some(rows_affected),
                    },
                    &self.shared.counters,
                );
                Ok(())
            }
            Err(LinkError::Statement { reason }) => {
                core.resolve(
                    dispatch.sequence,
                    Resolution::Failed(FailureReason::Statement { reason }),
                    &self.shared.counters,
                );
                Ok(())
            }
            Err(err) => {
                self.shared.counters.record(CounterEvent::Disruption);
                if !core.state.is_closed() {
                    core.transition(SessionState::Disrupted);
                }
                Err(err.to_string())
            }
        };
        drop(core);
        self.shared.changed.notify_all();
        outcome
    }

    fn resolve_unknown(&self, dispatch: &Dispatch, why: &str) {
        warn!(session = %self.id, sequence = dispatch.sequence, class = %dispatch.class, "{}, outcome unknown", why);
        let mut core = self.shared.core.lock();
        core.resolve(dispatch.sequence, Resolution::Unknown, &self.shared.counters);
        drop(core);
        self.shared.changed.notify_all();
    }

    // ========================================================================
    // Termination
    // ========================================================================

    fn exhaust(&mut self, attempts: u32) {
        warn!(session = %self.id, attempts, "reconnection attempts exhausted, closing session");
        let mut core = self.shared.core.lock();
        core.transition(SessionState::Closed);
        for (sequence, dispatched) in core.pending() {
            core.resolve(
                sequence,
                Resolution::Failed(FailureReason::DisruptionExhausted {
                    attempts,
                    dispatched,
                }),
                &self.shared.counters,
            );
        }
        drop(core);
        self.shared.changed.notify_all();
    }

    fn shutdown(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }

        let mut core = self.shared.core.lock();
        for (sequence, dispatched) in core.pending() {
            let resolution = if dispatched {
                Resolution::Unknown
            } else {
                Resolution::Failed(FailureReason::SessionClosed)
            };
            core.resolve(sequence, resolution, &self.shared.counters);
        }
        drop(core);
        self.shared.changed.notify_all();
        info!(session = %self.id, "session worker stopped");
    }
}
