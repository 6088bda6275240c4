//! Collaborator traits
//!
//! The session manager talks to the outside world only through these seams:
//!
//! - [`LinkConnector`] opens a [`PhysicalLink`] to an [`Endpoint`]
//! - [`CommitConfirmation`] answers "did operation X commit?" (optional)
//! - [`EndpointResolver`] picks the next endpoint to try on reconnection
//!
//! All of them are injected as `Arc<dyn ...>` so a wire driver, a pooled
//! connection, or a simulated backend can stand behind them.

use crate::error::{ConfirmationUnavailable, LinkError};
use crate::types::{Endpoint, OperationId};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Connection state of a physical link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Usable
    Open,
    /// Failed; will never work again
    Broken,
    /// Released by its owner
    Closed,
}

/// One statement execution request
///
/// The id lets the backend tag the commit so a later
/// [`CommitConfirmation::was_committed`] can answer for it.
#[derive(Debug, Clone, Copy)]
pub struct OperationRequest<'a> {
    /// Operation identity
    pub id: OperationId,
    /// Statement template
    pub statement: &'a str,
    /// Ordered bound parameters
    pub parameters: &'a [Value],
}

/// Successful execution result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Rows touched by the statement
    pub rows_affected: u64,
}

/// A raw connection to one backend instance
///
/// The link may die at any time. A link that returned
/// [`LinkError::Broken`] is discarded by its owner and never used again.
pub trait PhysicalLink: Send {
    /// Execute a statement and commit it
    fn execute(&mut self, request: &OperationRequest<'_>) -> Result<ExecutionResult, LinkError>;

    /// Current connection state
    fn state(&self) -> LinkState;

    /// Release the link
    fn close(&mut self);
}

/// Opens physical links
pub trait LinkConnector: Send + Sync {
    /// Open a link to `endpoint`
    ///
    /// Failures are reported as [`LinkError::Connection`].
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn PhysicalLink>, LinkError>;
}

/// Answers whether a previously dispatched operation committed
pub trait CommitConfirmation: Send + Sync {
    /// Check the backend's commit record for `id`
    fn was_committed(&self, id: &OperationId) -> Result<bool, ConfirmationUnavailable>;
}

/// Supplies candidate endpoints for link acquisition
pub trait EndpointResolver: Send + Sync {
    /// Endpoint for the given 1-based acquisition attempt
    fn next_endpoint(&self, attempt: u32) -> Endpoint;
}
