//! Core types for continuity
//!
//! This crate holds everything the other layers agree on:
//! - `value`: typed bound parameter values
//! - `types`: session/operation identifiers and endpoints
//! - `operation`: operation descriptors, idempotency classes and outcomes
//! - `traits`: the collaborator seams (physical link, commit confirmation,
//!   endpoint resolution)
//! - `error`: link-level error taxonomy
//! - `config`: session configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod operation;
pub mod traits;
pub mod types;
pub mod value;

pub use config::{ConfigError, ContinuityConfig, JournalConfig, ReconnectPolicy};
pub use error::{ConfirmationUnavailable, LinkError};
pub use operation::{
    Completion, FailureReason, IdempotencyClass, Operation, OperationDescriptor, Outcome,
};
pub use traits::{
    CommitConfirmation, EndpointResolver, ExecutionResult, LinkConnector, LinkState,
    OperationRequest, PhysicalLink,
};
pub use types::{Endpoint, EndpointParseError, OperationId, SessionId};
pub use value::Value;
