//! Operation descriptors
//!
//! An operation is a statement template plus its ordered parameters and the
//! caller's idempotency classification. Once submitted it becomes an
//! [`OperationDescriptor`] with a sequence number and an outcome.
//!
//! ## Outcome Lifecycle
//!
//! ```text
//!            +--> Committed
//! Pending ---+--> Failed
//!            +--> Unknown
//! ```
//!
//! Only `Pending` is non-terminal. A committed outcome never changes.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether re-executing an operation is safe, and how that is decided
///
/// The class is always supplied by the caller. Statement text is never
/// inspected: an insert-if-absent is idempotent, a blind counter increment
/// is not, and only the caller knows which one it wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdempotencyClass {
    /// Re-executing has no additional effect; replayed freely
    Idempotent,
    /// Replayed only after the backend confirms it did not commit
    AtMostOnce,
    /// Never replayed once dispatched; an interrupted execution is UNKNOWN
    Unsafe,
}

impl fmt::Display for IdempotencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdempotencyClass::Idempotent => "idempotent",
            IdempotencyClass::AtMostOnce => "at-most-once",
            IdempotencyClass::Unsafe => "unsafe",
        };
        f.write_str(name)
    }
}

/// Outcome of a submitted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Not yet resolved
    Pending,
    /// Applied by the backend
    Committed,
    /// Definitively not applied (or abandoned); see [`FailureReason`]
    Failed,
    /// The effect may or may not have happened
    Unknown,
}

impl Outcome {
    /// Terminal outcomes never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Pending => "PENDING",
            Outcome::Committed => "COMMITTED",
            Outcome::Failed => "FAILED",
            Outcome::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Why an operation ended in [`Outcome::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum FailureReason {
    /// The backend rejected the statement itself
    #[error("statement rejected: {reason}")]
    Statement {
        /// Backend message
        reason: String,
    },

    /// Reconnection attempts ran out and the session closed
    ///
    /// `dispatched` is true when the operation had already been sent on
    /// the broken link, so its effect may have reached the backend.
    #[error("reconnection exhausted after {attempts} attempts")]
    DisruptionExhausted {
        /// Failed acquisition attempts
        attempts: u32,
        /// Whether the operation was in flight when the link died
        dispatched: bool,
    },

    /// Cancelled by the caller before it was dispatched
    #[error("cancelled before dispatch")]
    Cancelled,

    /// The session was closed before the operation was dispatched
    #[error("session closed before dispatch")]
    SessionClosed,
}

/// An unsequenced unit of work, as handed in by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Statement template
    pub statement: String,
    /// Ordered bound parameters
    pub parameters: Vec<Value>,
    /// Caller-supplied idempotency class
    pub class: IdempotencyClass,
}

impl Operation {
    /// Create an operation
    pub fn new(
        statement: impl Into<String>,
        parameters: Vec<Value>,
        class: IdempotencyClass,
    ) -> Self {
        Self {
            statement: statement.into(),
            parameters,
            class,
        }
    }
}

/// A submitted operation tracked by the replay log
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Monotonic, gapless per session
    pub sequence: u64,
    /// The work itself
    pub operation: Operation,
    /// Current outcome
    pub outcome: Outcome,
    /// Set when `outcome` is `Failed`
    pub failure: Option<FailureReason>,
    /// Number of times the operation was sent to a link
    pub dispatch_count: u32,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
}

impl OperationDescriptor {
    /// Create a pending descriptor
    pub fn new(sequence: u64, operation: Operation) -> Self {
        Self {
            sequence,
            operation,
            outcome: Outcome::Pending,
            failure: None,
            dispatch_count: 0,
            submitted_at: Utc::now(),
        }
    }

    /// Idempotency class of the operation
    pub fn class(&self) -> IdempotencyClass {
        self.operation.class
    }

    /// Has this been sent to a link at least once
    pub fn is_dispatched(&self) -> bool {
        self.dispatch_count > 0
    }

    /// Is the outcome final
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }
}

/// What a caller gets back once an operation is terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Sequence of the operation
    pub sequence: u64,
    /// Terminal outcome
    pub outcome: Outcome,
    /// Present when `outcome` is `Failed`
    pub failure: Option<FailureReason>,
    /// Rows affected, when the backend reported it
    pub rows_affected: Option<u64>,
    /// Number of times the operation was sent to a link
    pub attempts: u32,
}

impl Completion {
    /// Did the backend apply it
    pub fn is_committed(&self) -> bool {
        self.outcome == Outcome::Committed
    }
}
