//! The resilient executor

use crate::ticket::Ticket;
use crate::{Error, Result};
use continuity_core::{
    CommitConfirmation, Completion, ContinuityConfig, Endpoint, EndpointResolver,
    IdempotencyClass, LinkConnector, Operation, SessionId, Value,
};
use continuity_session::{
    CancelStatus, Collaborators, CountersSnapshot, SessionHandle, SessionState, StaticEndpoints,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for [`ResilientExecutor`]
pub struct ExecutorBuilder {
    connector: Arc<dyn LinkConnector>,
    resolver: Option<Arc<dyn EndpointResolver>>,
    confirmation: Option<Arc<dyn CommitConfirmation>>,
    config: ContinuityConfig,
}

impl ExecutorBuilder {
    /// Endpoint resolution strategy
    pub fn endpoints(mut self, resolver: impl EndpointResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Always reconnect to one endpoint
    pub fn endpoint(self, endpoint: Endpoint) -> Self {
        self.endpoints(StaticEndpoints::single(endpoint))
    }

    /// Commit confirmation collaborator
    ///
    /// Without one, AT_MOST_ONCE operations interrupted in flight resolve
    /// UNKNOWN.
    pub fn confirmation(mut self, confirmation: impl CommitConfirmation + 'static) -> Self {
        self.confirmation = Some(Arc::new(confirmation));
        self
    }

    /// Session configuration
    pub fn config(mut self, config: ContinuityConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration
    ///
    /// The session itself starts on the first submission.
    pub fn build(self) -> Result<ResilientExecutor> {
        self.config.validate()?;
        let resolver = self.resolver.ok_or_else(|| Error::InvalidInput {
            reason: "no endpoints configured".into(),
        })?;

        Ok(ResilientExecutor {
            collaborators: Collaborators {
                connector: self.connector,
                resolver,
                confirmation: self.confirmation,
            },
            config: self.config,
            slot: Mutex::new(Slot::Idle),
        })
    }
}

/// Lifecycle of the executor's session
enum Slot {
    /// Nothing submitted yet
    Idle,
    Running(Arc<SessionHandle>),
    /// Closed before anything was submitted
    Closed,
}

/// Executes operations on one logical session that survives link loss
///
/// Operations run strictly in submission order. Link failures are
/// recovered inside the session; callers only see terminal outcomes,
/// timeouts and session closure.
pub struct ResilientExecutor {
    config: ContinuityConfig,
    collaborators: Collaborators,
    slot: Mutex<Slot>,
}

impl ResilientExecutor {
    /// Start building an executor over `connector`
    pub fn builder(connector: impl LinkConnector + 'static) -> ExecutorBuilder {
        ExecutorBuilder {
            connector: Arc::new(connector),
            resolver: None,
            confirmation: None,
            config: ContinuityConfig::default(),
        }
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit an operation and wait for its outcome
    ///
    /// Waits up to the configured `submit_timeout_ms` (indefinitely if
    /// unset). A returned [`Completion`] is terminal: COMMITTED, FAILED or
    /// UNKNOWN.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`]: still PENDING; it may complete later through
    ///   replay
    /// - [`Error::SessionClosed`]: the session no longer accepts work
    /// - [`Error::Backpressure`]: too many operations awaiting an outcome
    pub fn submit(
        &self,
        statement: impl Into<String>,
        parameters: Vec<Value>,
        class: IdempotencyClass,
    ) -> Result<Completion> {
        self.submit_with_timeout(statement, parameters, class, self.config.submit_timeout())
    }

    /// Submit with an explicit timeout (`None` waits until terminal)
    pub fn submit_with_timeout(
        &self,
        statement: impl Into<String>,
        parameters: Vec<Value>,
        class: IdempotencyClass,
        timeout: Option<Duration>,
    ) -> Result<Completion> {
        let ticket = self.enqueue(statement, parameters, class)?;
        ticket.wait(timeout)
    }

    /// Submit without waiting
    ///
    /// The operation is in the replay log when this returns.
    pub fn enqueue(
        &self,
        statement: impl Into<String>,
        parameters: Vec<Value>,
        class: IdempotencyClass,
    ) -> Result<Ticket> {
        let session = self.session()?;
        let operation = Operation::new(statement, parameters, class);
        let sequence = session.enqueue(operation)?;
        debug!(session = %session.id(), sequence, %class, "operation enqueued");
        Ok(Ticket::new(session, sequence))
    }

    /// The running session, started on first use
    fn session(&self) -> Result<Arc<SessionHandle>> {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Running(session) => return Ok(Arc::clone(session)),
            Slot::Closed => {
                return Err(Error::SessionClosed {
                    session: "<never started>".into(),
                })
            }
            Slot::Idle => {}
        }

        let session = Arc::new(SessionHandle::start(
            &self.config,
            self.collaborators.clone(),
        )?);
        *slot = Slot::Running(Arc::clone(&session));
        Ok(session)
    }

    fn running(&self) -> Option<Arc<SessionHandle>> {
        match &*self.slot.lock() {
            Slot::Running(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Cancel an operation if it was never dispatched
    pub fn cancel(&self, ticket: &Ticket) -> CancelStatus {
        ticket.cancel()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Logical session id, once the session has started
    pub fn session_id(&self) -> Option<SessionId> {
        self.running().map(|s| s.id())
    }

    /// Current session state, once the session has started
    pub fn state(&self) -> Option<SessionState> {
        match &*self.slot.lock() {
            Slot::Idle => None,
            Slot::Running(session) => Some(session.state()),
            Slot::Closed => Some(SessionState::Closed),
        }
    }

    /// Highest committed sequence
    pub fn last_committed(&self) -> u64 {
        self.running().map_or(0, |s| s.last_committed())
    }

    /// Operations retained and not yet terminal
    pub fn pending_count(&self) -> usize {
        self.running().map_or(0, |s| s.pending_count())
    }

    /// Counters for this session
    pub fn counters(&self) -> CountersSnapshot {
        self.running()
            .map(|s| s.counters())
            .unwrap_or_default()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the session
    ///
    /// Undispatched operations fail with `SessionClosed`. Subsequent
    /// submissions return [`Error::SessionClosed`].
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        let session = match &*slot {
            Slot::Running(session) => Some(Arc::clone(session)),
            _ => None,
        };
        if session.is_none() {
            *slot = Slot::Closed;
        }
        drop(slot);

        // Joining the worker happens outside the slot lock
        if let Some(session) = session {
            session.close();
        }
    }
}

impl Drop for ResilientExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("session", &self.session_id())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
