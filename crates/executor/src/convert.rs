//! Error conversion from the lower layers

use crate::Error;
use continuity_core::ConfigError;
use continuity_durability::LogError;
use continuity_session::SessionError;

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Closed { session } => Error::SessionClosed {
                session: session.to_string(),
            },
            SessionError::Timeout {
                sequence,
                waited_ms,
            } => Error::Timeout {
                sequence,
                waited_ms,
            },
            SessionError::UnknownOperation { sequence } => Error::InvalidInput {
                reason: format!("operation {} is not tracked", sequence),
            },
            SessionError::Log(err) => err.into(),
            SessionError::Spawn(err) => Error::Internal {
                reason: format!("failed to start session worker: {}", err),
            },
        }
    }
}

impl From<LogError> for Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::CapacityExceeded { capacity } => Error::Backpressure { capacity },
            LogError::Journal(err) => Error::Io {
                reason: err.to_string(),
            },
            other => Error::Internal {
                reason: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::InvalidInput {
            reason: err.to_string(),
        }
    }
}
