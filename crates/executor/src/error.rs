//! Executor error type
//!
//! Link-level failures never appear here; the session recovers them or
//! turns them into a terminal [`Completion`](continuity_core::Completion).
//! What remains is what a caller can act on.

use thiserror::Error;

/// Errors returned to callers of the executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The wait elapsed before the outcome became terminal
    ///
    /// The operation is still PENDING and may complete later through
    /// replay. This is not a failure of the operation.
    #[error("operation {sequence} still pending after {waited_ms}ms")]
    Timeout {
        /// Sequence of the pending operation
        sequence: u64,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// The session is closed and accepts no new work
    #[error("session {session} is closed")]
    SessionClosed {
        /// Session id
        session: String,
    },

    /// Too many operations are awaiting an outcome
    #[error("replay log full ({capacity} pending operations)")]
    Backpressure {
        /// Log capacity
        capacity: usize,
    },

    /// Bad configuration or arguments
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Description
        reason: String,
    },

    /// The persisted journal could not be written
    #[error("I/O error: {reason}")]
    Io {
        /// Description
        reason: String,
    },

    /// Unexpected internal condition
    #[error("internal error: {reason}")]
    Internal {
        /// Description
        reason: String,
    },
}

impl Error {
    /// Whether the operation may still complete
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;
