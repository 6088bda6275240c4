//! Static endpoint resolution
//!
//! The simplest [`EndpointResolver`]: a fixed candidate list, typically a
//! primary address followed by its standby, tried in rotation.

use continuity_core::{Endpoint, EndpointResolver};

/// Fixed list of candidate endpoints tried in rotation
#[derive(Debug, Clone)]
pub struct StaticEndpoints {
    endpoints: Vec<Endpoint>,
    offset: usize,
}

impl StaticEndpoints {
    /// Create from a candidate list; `None` if the list is empty
    pub fn new(endpoints: Vec<Endpoint>) -> Option<Self> {
        if endpoints.is_empty() {
            return None;
        }
        Some(Self {
            endpoints,
            offset: 0,
        })
    }

    /// A single endpoint
    pub fn single(endpoint: Endpoint) -> Self {
        Self {
            endpoints: vec![endpoint],
            offset: 0,
        }
    }

    /// Start the rotation at a different candidate
    ///
    /// Spreading sessions over candidates by giving each a different
    /// offset is how load balancing is expressed here.
    pub fn starting_at(mut self, offset: usize) -> Self {
        self.offset = offset % self.endpoints.len();
        self
    }

    /// Candidate list
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

impl EndpointResolver for StaticEndpoints {
    fn next_endpoint(&self, attempt: u32) -> Endpoint {
        let step = attempt.saturating_sub(1) as usize;
        let index = (self.offset + step) % self.endpoints.len();
        self.endpoints[index].clone()
    }
}
