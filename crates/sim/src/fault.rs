//! Injected faults

use std::collections::{BTreeMap, HashSet};

/// Where an injected link break lands relative to the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakMode {
    /// Link dies before the statement reaches the store
    BeforeApply,
    /// Statement commits, then the link dies before the reply
    AfterApply,
}

#[derive(Debug, Default)]
pub(crate) struct Faults {
    /// Remaining link acquisitions to refuse
    pub(crate) failing_opens: u32,
    /// Hosts that refuse acquisition
    pub(crate) down_hosts: HashSet<String>,
    /// Breaks keyed by 1-based execution number
    pub(crate) breaks: BTreeMap<u64, BreakMode>,
}

impl Faults {
    /// Consume an acquisition fault for `host`, if one applies
    pub(crate) fn take_open_failure(&mut self, host: &str) -> Option<String> {
        if self.down_hosts.contains(host) {
            return Some(format!("host {} is down", host));
        }
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            return Some("listener refused connection".to_string());
        }
        None
    }

    pub(crate) fn take_break(&mut self, execution: u64) -> Option<BreakMode> {
        self.breaks.remove(&execution)
    }
}
