//! Public types for the continuity API
//!
//! Re-exports from the internal crates with a flat public surface.

// ============================================================================
// Operations and outcomes
// ============================================================================

pub use continuity_core::{
    Completion, FailureReason, IdempotencyClass, Operation, OperationDescriptor, Outcome, Value,
};

// ============================================================================
// Identity and endpoints
// ============================================================================

pub use continuity_core::{Endpoint, EndpointParseError, OperationId, SessionId};

// ============================================================================
// Collaborator seams
// ============================================================================

pub use continuity_core::{
    CommitConfirmation, ConfirmationUnavailable, EndpointResolver, ExecutionResult, LinkConnector,
    LinkError, LinkState, OperationRequest, PhysicalLink,
};
pub use continuity_session::StaticEndpoints;

// ============================================================================
// Configuration
// ============================================================================

pub use continuity_core::{ConfigError, ContinuityConfig, JournalConfig, ReconnectPolicy};

// ============================================================================
// Session observation
// ============================================================================

pub use continuity_session::{process_counters, CancelStatus, CountersSnapshot, SessionState};

// ============================================================================
// Journal inspection
// ============================================================================

pub use continuity_durability::{read_journal, JournalCorruption, JournalReadResult, JournalRecord};
