//! Link-level error taxonomy
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | `LinkError::Connection` | `LinkConnector::open` | retried with backoff, eventually fatal |
//! | `LinkError::Broken` | `PhysicalLink::execute` | session goes DISRUPTED, operation replayable |
//! | `LinkError::Statement` | `PhysicalLink::execute` | operation FAILED, never retried |
//! | `ConfirmationUnavailable` | `CommitConfirmation::was_committed` | AT_MOST_ONCE degrades to UNSAFE |
//!
//! None of these reach the caller of `submit` directly; they are recovered
//! or turned into terminal outcomes by the session manager.

use thiserror::Error;

/// Failure reported by a physical link or its connector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// A link could not be established
    #[error("connection error: {reason}")]
    Connection {
        /// Description
        reason: String,
    },

    /// An existing link died mid-operation
    #[error("link broken: {reason}")]
    Broken {
        /// Description
        reason: String,
    },

    /// The backend rejected the statement (constraint violation, syntax, ...)
    #[error("statement rejected: {reason}")]
    Statement {
        /// Backend message
        reason: String,
    },
}

impl LinkError {
    /// Create a connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        LinkError::Connection {
            reason: reason.into(),
        }
    }

    /// Create a broken-link error
    pub fn broken(reason: impl Into<String>) -> Self {
        LinkError::Broken {
            reason: reason.into(),
        }
    }

    /// Create a statement error
    pub fn statement(reason: impl Into<String>) -> Self {
        LinkError::Statement {
            reason: reason.into(),
        }
    }

    /// Does this mean the link itself is gone
    pub fn is_link_failure(&self) -> bool {
        !matches!(self, LinkError::Statement { .. })
    }
}

/// The backend cannot currently answer whether an operation committed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("commit confirmation unavailable: {reason}")]
pub struct ConfirmationUnavailable {
    /// Description
    pub reason: String,
}

impl ConfirmationUnavailable {
    /// Create the error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_failure_classification() {
        assert!(LinkError::broken("reset").is_link_failure());
        assert!(LinkError::connection("refused").is_link_failure());
        assert!(!LinkError::statement("ORA-00001").is_link_failure());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            LinkError::broken("switchover").to_string(),
            "link broken: switchover"
        );
        assert_eq!(
            ConfirmationUnavailable::new("no ltxid").to_string(),
            "commit confirmation unavailable: no ltxid"
        );
    }
}
