//! Caller-side session API
//!
//! A [`SessionHandle`] appends work to the replay log and waits for
//! outcomes. It never touches the physical link; that belongs to the
//! worker thread started alongside it.

use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::metrics::{CounterEvent, CountersSnapshot};
use crate::shared::{Resolution, SessionCore, SessionShared};
use crate::state::SessionState;
use continuity_core::{
    CommitConfirmation, Completion, ContinuityConfig, EndpointResolver, FailureReason,
    LinkConnector, Operation, Outcome, SessionId,
};
use continuity_durability::{JournalWriter, LogError, ReplayLog};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// External collaborators injected into a session
#[derive(Clone)]
pub struct Collaborators {
    /// Opens physical links
    pub connector: Arc<dyn LinkConnector>,
    /// Picks endpoints for acquisition attempts
    pub resolver: Arc<dyn EndpointResolver>,
    /// Answers commit queries; without it AT_MOST_ONCE degrades to UNSAFE
    pub confirmation: Option<Arc<dyn CommitConfirmation>>,
}

/// Result of a cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStatus {
    /// Removed before dispatch; resolved FAILED (cancelled)
    Cancelled,
    /// Already sent to a link; its effect may be committed, so it stays
    /// PENDING until replay or timeout resolves it
    CannotConfirm,
    /// Already terminal
    AlreadyResolved(Outcome),
    /// No such operation
    NotFound,
}

/// Handle to one logical session and its worker
pub struct SessionHandle {
    id: SessionId,
    shared: Arc<SessionShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// Create a session and start its worker
    ///
    /// The worker begins acquiring the first link immediately.
    pub fn start(
        config: &ContinuityConfig,
        collaborators: Collaborators,
    ) -> Result<Self, SessionError> {
        let id = SessionId::new();
        let log = match &config.journal {
            Some(journal) => {
                let writer = JournalWriter::open(&journal.path, journal.sync).map_err(LogError::from)?;
                ReplayLog::with_journal(config.replay_log_capacity, writer)
            }
            None => ReplayLog::new(config.replay_log_capacity),
        };

        let shared = Arc::new(SessionShared::new(SessionCore::new(id, log)));
        let manager = SessionManager::new(
            id,
            Arc::clone(&shared),
            collaborators,
            config.reconnect.clone(),
        );
        let worker = std::thread::Builder::new()
            .name(format!("continuity-session-{}", id))
            .spawn(move || manager.run())
            .map_err(SessionError::Spawn)?;

        info!(session = %id, "session created");
        Ok(Self {
            id,
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.shared.core.lock().state
    }

    /// Highest committed sequence so far
    pub fn last_committed(&self) -> u64 {
        self.shared.core.lock().last_committed
    }

    /// Retained operations not yet terminal
    pub fn pending_count(&self) -> usize {
        self.shared.core.lock().log.pending_count()
    }

    /// Counters for this session
    pub fn counters(&self) -> CountersSnapshot {
        self.shared.counters.snapshot()
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Append an operation to the replay log
    ///
    /// The operation is recorded before anything is sent, so an interrupted
    /// execution always leaves a replayable entry behind.
    ///
    /// # Returns
    ///
    /// The operation's sequence number
    pub fn enqueue(&self, operation: Operation) -> Result<u64, SessionError> {
        let mut core = self.shared.core.lock();
        if core.state.is_closed() {
            return Err(SessionError::Closed { session: self.id });
        }
        let sequence = core.log.append(operation)?;
        core.waiting.insert(sequence);
        self.shared.counters.record(CounterEvent::Submitted);
        drop(core);

        self.shared.changed.notify_all();
        Ok(sequence)
    }

    /// Wait for an operation to become terminal
    ///
    /// With `timeout = None` this waits until the outcome is terminal. On
    /// timeout the operation stays PENDING and can be waited on again.
    pub fn wait(
        &self,
        sequence: u64,
        timeout: Option<Duration>,
    ) -> Result<Completion, SessionError> {
        let started = Instant::now();
        // A deadline past the clock's range waits without bound
        let deadline = timeout.and_then(|t| started.checked_add(t));
        let mut core = self.shared.core.lock();

        loop {
            if let Some(completion) = core.resolved.get(&sequence) {
                return Ok(completion.clone());
            }
            if !core.waiting.contains(&sequence) {
                return Err(SessionError::UnknownOperation { sequence });
            }

            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .changed
                        .wait_until(&mut core, deadline)
                        .timed_out()
                    {
                        if let Some(completion) = core.resolved.get(&sequence) {
                            return Ok(completion.clone());
                        }
                        return Err(SessionError::Timeout {
                            sequence,
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                }
                None => self.shared.changed.wait(&mut core),
            }
        }
    }

    /// Current outcome of an operation still retained or held for a waiter
    pub fn outcome(&self, sequence: u64) -> Option<Outcome> {
        self.shared.core.lock().outcome(sequence)
    }

    /// Stop holding the outcome of an operation for a waiter
    pub fn forget(&self, sequence: u64) {
        let mut core = self.shared.core.lock();
        core.waiting.remove(&sequence);
        core.resolved.remove(&sequence);
    }

    /// Cancel an operation
    ///
    /// Only operations never dispatched can be cancelled; anything already
    /// sent may have committed and yields [`CancelStatus::CannotConfirm`].
    pub fn cancel(&self, sequence: u64) -> CancelStatus {
        let mut core = self.shared.core.lock();

        let (terminal, dispatched, outcome) = match core.log.get(sequence) {
            Some(entry) => (entry.is_terminal(), entry.is_dispatched(), entry.outcome),
            None => {
                return match core.resolved.get(&sequence) {
                    Some(completion) => CancelStatus::AlreadyResolved(completion.outcome),
                    None => CancelStatus::NotFound,
                };
            }
        };

        if terminal {
            return CancelStatus::AlreadyResolved(outcome);
        }
        if dispatched {
            return CancelStatus::CannotConfirm;
        }

        core.resolve(
            sequence,
            Resolution::Failed(FailureReason::Cancelled),
            &self.shared.counters,
        );
        self.shared.counters.record(CounterEvent::Cancelled);
        drop(core);

        self.shared.changed.notify_all();
        CancelStatus::Cancelled
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Close the session and wait for the worker to stop
    ///
    /// Undispatched operations fail with `SessionClosed`; an operation in
    /// flight resolves from the link's answer.
    pub fn close(&self) {
        {
            let mut core = self.shared.core.lock();
            if !core.state.is_closed() {
                core.transition(SessionState::Closed);
                for (sequence, dispatched) in core.pending() {
                    if !dispatched {
                        core.resolve(
                            sequence,
                            Resolution::Failed(FailureReason::SessionClosed),
                            &self.shared.counters,
                        );
                    }
                }
            }
        }
        self.shared.changed.notify_all();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!(session = %self.id, "session worker panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
