//! Session counters
//!
//! Every session keeps its own counters and mirrors each increment into
//! a process-wide set. All updates are relaxed atomic adds.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static PROCESS_COUNTERS: ContinuityCounters = ContinuityCounters::new();

/// Snapshot of the process-wide counters
pub fn process_counters() -> CountersSnapshot {
    PROCESS_COUNTERS.snapshot()
}

/// Countable session events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    /// Operation appended to the replay log
    Submitted,
    /// Operation resolved COMMITTED
    Committed,
    /// Operation resolved FAILED
    Failed,
    /// Operation resolved UNKNOWN
    Unknown,
    /// Operation re-executed after reconnection
    Replayed,
    /// Link failure detected
    Disruption,
    /// Link opened
    LinkAcquired,
    /// Link open failed
    AcquisitionFailure,
    /// Operation cancelled before dispatch
    Cancelled,
}

/// Atomic counters for one session (or the whole process)
#[derive(Debug, Default)]
pub struct ContinuityCounters {
    submitted: AtomicU64,
    committed: AtomicU64,
    failed: AtomicU64,
    unknown: AtomicU64,
    replayed: AtomicU64,
    disruptions: AtomicU64,
    link_acquisitions: AtomicU64,
    acquisition_failures: AtomicU64,
    cancelled: AtomicU64,
}

impl ContinuityCounters {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            unknown: AtomicU64::new(0),
            replayed: AtomicU64::new(0),
            disruptions: AtomicU64::new(0),
            link_acquisitions: AtomicU64::new(0),
            acquisition_failures: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    /// Count an event here and in the process-wide counters
    pub fn record(&self, event: CounterEvent) {
        self.bump(event);
        PROCESS_COUNTERS.bump(event);
    }

    fn bump(&self, event: CounterEvent) {
        let counter = match event {
            CounterEvent::Submitted => &self.submitted,
            CounterEvent::Committed => &self.committed,
            CounterEvent::Failed => &self.failed,
            CounterEvent::Unknown => &self.unknown,
            CounterEvent::Replayed => &self.replayed,
            CounterEvent::Disruption => &self.disruptions,
            CounterEvent::LinkAcquired => &self.link_acquisitions,
            CounterEvent::AcquisitionFailure => &self.acquisition_failures,
            CounterEvent::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            disruptions: self.disruptions.load(Ordering::Relaxed),
            link_acquisitions: self.link_acquisitions.load(Ordering::Relaxed),
            acquisition_failures: self.acquisition_failures.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of a counter set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    /// Operations appended
    pub submitted: u64,
    /// Operations committed
    pub committed: u64,
    /// Operations failed
    pub failed: u64,
    /// Operations resolved unknown
    pub unknown: u64,
    /// Re-executions after reconnection
    pub replayed: u64,
    /// Link failures detected
    pub disruptions: u64,
    /// Links opened
    pub link_acquisitions: u64,
    /// Failed link opens
    pub acquisition_failures: u64,
    /// Operations cancelled
    pub cancelled: u64,
}
