//! Session errors

use continuity_core::SessionId;
use continuity_durability::LogError;
use thiserror::Error;

/// Errors surfaced by a session handle
///
/// Link-level failures never appear here; the manager recovers them or
/// turns them into terminal outcomes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session is closed and accepts no more work
    #[error("session {session} is closed")]
    Closed {
        /// Session id
        session: SessionId,
    },

    /// The operation is still pending after the caller's timeout
    #[error("operation {sequence} still pending after {waited_ms}ms")]
    Timeout {
        /// Operation sequence
        sequence: u64,
        /// Time spent waiting
        waited_ms: u64,
    },

    /// No such operation is tracked for this caller
    #[error("unknown operation {sequence}")]
    UnknownOperation {
        /// Operation sequence
        sequence: u64,
    },

    /// Replay log refused the change
    #[error(transparent)]
    Log(#[from] LogError),

    /// The worker thread could not be started
    #[error("failed to start session worker: {0}")]
    Spawn(#[source] std::io::Error),
}
