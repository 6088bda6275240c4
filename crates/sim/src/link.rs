//! Collaborator implementations over [`SimBackend`]

use crate::backend::{Executed, SimBackend};
use continuity_core::{
    CommitConfirmation, ConfirmationUnavailable, Endpoint, ExecutionResult, LinkConnector,
    LinkError, LinkState, OperationId, OperationRequest, PhysicalLink,
};
use tracing::debug;

/// Opens [`SimLink`]s
#[derive(Debug, Clone)]
pub struct SimConnector {
    backend: SimBackend,
}

impl SimConnector {
    /// Connector for `backend`
    pub fn new(backend: SimBackend) -> Self {
        Self { backend }
    }
}

impl LinkConnector for SimConnector {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn PhysicalLink>, LinkError> {
        let mut state = self.backend.inner.lock();
        if let Some(reason) = state.faults.take_open_failure(&endpoint.host) {
            debug!(endpoint = %endpoint, %reason, "refusing link");
            return Err(LinkError::connection(reason));
        }
        state.opens += 1;
        state.opened_endpoints.push(endpoint.clone());
        Ok(Box::new(SimLink {
            backend: self.backend.clone(),
            generation: state.generation,
            state: LinkState::Open,
        }))
    }
}

/// One simulated connection
#[derive(Debug)]
pub struct SimLink {
    backend: SimBackend,
    generation: u64,
    state: LinkState,
}

impl PhysicalLink for SimLink {
    fn execute(&mut self, request: &OperationRequest<'_>) -> Result<ExecutionResult, LinkError> {
        if self.state != LinkState::Open {
            return Err(LinkError::broken(format!("link is {:?}", self.state)));
        }

        let mut backend = self.backend.inner.lock();
        if backend.generation != self.generation {
            self.state = LinkState::Broken;
            return Err(LinkError::broken("instance changed role"));
        }

        match backend.execute(request) {
            Executed::Applied(result) => result.map(|rows_affected| ExecutionResult { rows_affected }),
            Executed::LinkLost { .. } => {
                self.state = LinkState::Broken;
                Err(LinkError::broken("connection reset by peer"))
            }
        }
    }

    fn state(&self) -> LinkState {
        self.state
    }

    fn close(&mut self) {
        if self.state == LinkState::Open {
            self.state = LinkState::Closed;
        }
    }
}

/// Answers commit queries from the backend's commit record
#[derive(Debug, Clone)]
pub struct SimConfirmation {
    backend: SimBackend,
}

impl SimConfirmation {
    /// Confirmation for `backend`
    pub fn new(backend: SimBackend) -> Self {
        Self { backend }
    }
}

impl CommitConfirmation for SimConfirmation {
    fn was_committed(&self, id: &OperationId) -> Result<bool, ConfirmationUnavailable> {
        let state = self.backend.inner.lock();
        if state.confirmation_unavailable {
            return Err(ConfirmationUnavailable::new("commit record not reachable"));
        }
        Ok(state.committed.contains(id))
    }
}
