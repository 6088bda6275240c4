//! Replay log
//!
//! Bounded journal of in-flight and recently completed operations, keyed
//! by a monotonic sequence number.
//!
//! # Design
//!
//! - Entries live in a `VecDeque` in sequence order. Nothing is ever removed
//!   from the middle, so `sequence - front.sequence` is the index of any
//!   retained entry (O(1) lookup, O(1) amortized append).
//! - Pruning pops the contiguous terminal prefix. The checkpoint is the
//!   highest sequence at or below which every operation is terminal.
//! - A PENDING entry is never pruned, whatever its position.
//!
//! # Invariants
//!
//! - Sequences start at 1 and are strictly increasing and gapless
//! - Outcomes only move out of PENDING; COMMITTED never changes
//! - `pending_since` yields entries in submission order

use crate::journal::{JournalError, JournalRecord, JournalWriter};
use continuity_core::{FailureReason, Operation, OperationDescriptor, Outcome};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Replay log errors
#[derive(Debug, Error)]
pub enum LogError {
    /// The log is full of unresolved operations
    #[error("replay log full: {capacity} entries retained")]
    CapacityExceeded {
        /// Configured capacity
        capacity: usize,
    },

    /// No retained entry has this sequence
    #[error("unknown sequence {sequence}")]
    UnknownSequence {
        /// Requested sequence
        sequence: u64,
    },

    /// The entry is already terminal
    #[error("operation {sequence} already resolved as {outcome}")]
    AlreadyResolved {
        /// Requested sequence
        sequence: u64,
        /// Its terminal outcome
        outcome: Outcome,
    },

    /// Persisting the change failed
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Bounded, ordered journal of submitted operations
#[derive(Debug)]
pub struct ReplayLog {
    entries: VecDeque<OperationDescriptor>,
    next_sequence: u64,
    checkpoint: u64,
    capacity: usize,
    journal: Option<JournalWriter>,
}

impl ReplayLog {
    /// Create an in-memory log
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum retained entries before `append` refuses
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
            checkpoint: 0,
            capacity: capacity.max(1),
            journal: None,
        }
    }

    /// Create a log that also persists every change
    pub fn with_journal(capacity: usize, journal: JournalWriter) -> Self {
        let mut log = Self::new(capacity);
        log.journal = Some(journal);
        log
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append an operation as PENDING
    ///
    /// # Returns
    ///
    /// The sequence number assigned to the operation
    pub fn append(&mut self, operation: Operation) -> Result<u64, LogError> {
        if self.entries.len() >= self.capacity {
            return Err(LogError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let sequence = self.next_sequence;
        let descriptor = OperationDescriptor::new(sequence, operation);
        if let Some(journal) = self.journal.as_mut() {
            journal.append(&JournalRecord::from(&descriptor))?;
        }

        self.entries.push_back(descriptor);
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Record that the operation was sent to a link
    ///
    /// # Returns
    ///
    /// The dispatch count after this call
    pub fn mark_dispatched(&mut self, sequence: u64) -> Result<u32, LogError> {
        let entry = self.pending_entry_mut(sequence)?;
        entry.dispatch_count += 1;
        Ok(entry.dispatch_count)
    }

    /// Resolve an operation as COMMITTED and prune
    pub fn mark_committed(&mut self, sequence: u64) -> Result<(), LogError> {
        self.resolve(sequence, Outcome::Committed, None)
    }

    /// Resolve an operation as FAILED and prune
    pub fn mark_failed(&mut self, sequence: u64, reason: FailureReason) -> Result<(), LogError> {
        self.resolve(sequence, Outcome::Failed, Some(reason))
    }

    /// Resolve an operation as UNKNOWN and prune
    pub fn mark_unknown(&mut self, sequence: u64) -> Result<(), LogError> {
        self.resolve(sequence, Outcome::Unknown, None)
    }

    fn resolve(
        &mut self,
        sequence: u64,
        outcome: Outcome,
        failure: Option<FailureReason>,
    ) -> Result<(), LogError> {
        let entry = self.pending_entry_mut(sequence)?;
        entry.outcome = outcome;
        entry.failure = failure;
        let record = JournalRecord::from(&*entry);

        // The in-memory outcome stands even if persisting it fails
        let journaled = match self.journal.as_mut() {
            Some(journal) => journal.append(&record),
            None => Ok(()),
        };
        self.prune();
        journaled.map_err(LogError::from)
    }

    /// Drop the contiguous terminal prefix
    fn prune(&mut self) {
        let mut pruned = 0usize;
        while self
            .entries
            .front()
            .map(|e| e.is_terminal())
            .unwrap_or(false)
        {
            if let Some(entry) = self.entries.pop_front() {
                self.checkpoint = entry.sequence;
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!(pruned, checkpoint = self.checkpoint, "replay log pruned");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Non-terminal entries with sequence greater than `sequence`, in
    /// submission order
    pub fn pending_since(&self, sequence: u64) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries
            .iter()
            .filter(move |e| e.sequence > sequence && e.outcome == Outcome::Pending)
    }

    /// First pending entry never sent to a link
    pub fn next_undispatched(&self) -> Option<&OperationDescriptor> {
        self.entries
            .iter()
            .find(|e| e.outcome == Outcome::Pending && !e.is_dispatched())
    }

    /// Look up a retained entry
    pub fn get(&self, sequence: u64) -> Option<&OperationDescriptor> {
        let index = self.index_of(sequence)?;
        self.entries.get(index)
    }

    /// Highest sequence at or below which everything is terminal and pruned
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    /// Sequence the next append will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retained PENDING entries
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == Outcome::Pending)
            .count()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index_of(&self, sequence: u64) -> Option<usize> {
        let front = self.entries.front()?.sequence;
        if sequence < front {
            return None;
        }
        let index = (sequence - front) as usize;
        (index < self.entries.len()).then_some(index)
    }

    fn pending_entry_mut(&mut self, sequence: u64) -> Result<&mut OperationDescriptor, LogError> {
        let index = self
            .index_of(sequence)
            .ok_or(LogError::UnknownSequence { sequence })?;
        let entry = &mut self.entries[index];
        if entry.is_terminal() {
            return Err(LogError::AlreadyResolved {
                sequence,
                outcome: entry.outcome,
            });
        }
        Ok(entry)
    }
}
