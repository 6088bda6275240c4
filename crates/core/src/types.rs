//! Identifiers and endpoints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of a logical session
///
/// A session outlives any single physical link; the id stays the same
/// across every reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session id
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        SessionId(uuid)
    }

    /// Raw UUID bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique identifier of one submitted operation
///
/// This is what a backend tags a commit with, and what the commit
/// confirmation collaborator is asked about after a disruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId {
    /// Owning session
    pub session: SessionId,
    /// Sequence number within the session
    pub sequence: u64,
}

impl OperationId {
    /// Create an operation id
    pub fn new(session: SessionId, sequence: u64) -> Self {
        Self { session, sequence }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session, self.sequence)
    }
}

/// Error parsing an [`Endpoint`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    /// Host part is empty
    #[error("endpoint '{input}' has no host")]
    MissingHost {
        /// The rejected input
        input: String,
    },
    /// Port is not a valid u16
    #[error("endpoint '{input}' has invalid port '{port}'")]
    InvalidPort {
        /// The rejected input
        input: String,
        /// The port text
        port: String,
    },
}

/// Address of one backend instance
///
/// Parsed from `host:port/service`, with an optional leading `//`
/// (`//primary-scan:1521/br_tac_svc`). The port defaults to 1521.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Service name, if any
    pub service: Option<String>,
}

impl Endpoint {
    /// Default listener port
    pub const DEFAULT_PORT: u16 = 1521;

    /// Create an endpoint without a service name
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            service: None,
        }
    }

    /// Attach a service name
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("//");
        let (address, service) = match trimmed.split_once('/') {
            Some((addr, svc)) if !svc.is_empty() => (addr, Some(svc.to_string())),
            Some((addr, _)) => (addr, None),
            None => (trimmed, None),
        };

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| EndpointParseError::InvalidPort {
                        input: s.to_string(),
                        port: port.to_string(),
                    })?;
                (host, port)
            }
            None => (address, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(EndpointParseError::MissingHost {
                input: s.to_string(),
            });
        }

        Ok(Endpoint {
            host: host.to_string(),
            port,
            service,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(service) = &self.service {
            write!(f, "/{}", service)?;
        }
        Ok(())
    }
}
