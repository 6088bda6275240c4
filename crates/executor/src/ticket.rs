//! Handles to submitted operations

use crate::{Error, Result};
use continuity_core::{Completion, Outcome};
use continuity_session::{CancelStatus, SessionHandle};
use std::sync::Arc;
use std::time::Duration;

/// A submitted operation
///
/// The outcome is held for the ticket until it is dropped, so a ticket can
/// be waited on again after a timeout.
pub struct Ticket {
    session: Arc<SessionHandle>,
    sequence: u64,
}

impl Ticket {
    pub(crate) fn new(session: Arc<SessionHandle>, sequence: u64) -> Self {
        Self { session, sequence }
    }

    /// Sequence number within the session
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wait for a terminal outcome
    ///
    /// `None` waits indefinitely. On [`Error::Timeout`] the operation is
    /// still PENDING.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Completion> {
        self.session
            .wait(self.sequence, timeout)
            .map_err(Error::from)
    }

    /// Current outcome without blocking
    pub fn outcome(&self) -> Outcome {
        self.session
            .outcome(self.sequence)
            .unwrap_or(Outcome::Pending)
    }

    /// Cancel the operation if it was never dispatched
    pub fn cancel(&self) -> CancelStatus {
        self.session.cancel(self.sequence)
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.session.forget(self.sequence);
    }
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("session", &self.session.id())
            .field("sequence", &self.sequence)
            .finish()
    }
}
