//! Journal record

use continuity_core::{IdempotencyClass, OperationDescriptor, Outcome, Value};
use serde::{Deserialize, Serialize};

/// One persisted replay log entry state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Operation sequence
    pub sequence: u64,
    /// Statement template
    pub statement: String,
    /// Ordered bound parameters
    pub parameters: Vec<Value>,
    /// Idempotency class
    pub class: IdempotencyClass,
    /// Outcome at the time of writing
    pub outcome: Outcome,
}

impl From<&OperationDescriptor> for JournalRecord {
    fn from(desc: &OperationDescriptor) -> Self {
        JournalRecord {
            sequence: desc.sequence,
            statement: desc.operation.statement.clone(),
            parameters: desc.operation.parameters.clone(),
            class: desc.operation.class,
            outcome: desc.outcome,
        }
    }
}
