//! Session states

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a logical session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Link open, serving operations
    Active,
    /// Link failure detected, no replacement yet
    Disrupted,
    /// Acquiring a new link and replaying in-flight operations
    Reconnecting,
    /// Terminal
    Closed,
}

impl SessionState {
    /// Is `next` a legal successor of this state
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        if self == next || next == Closed {
            return true;
        }
        matches!(
            (self, next),
            (Active, Disrupted)
                | (Disrupted, Reconnecting)
                | (Reconnecting, Active)
                | (Reconnecting, Disrupted)
        )
    }

    /// Is this the terminal state
    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Active => "ACTIVE",
            SessionState::Disrupted => "DISRUPTED",
            SessionState::Reconnecting => "RECONNECTING",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(Active.can_transition_to(Disrupted));
        assert!(Disrupted.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Active));
        assert!(Reconnecting.can_transition_to(Disrupted));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Active.can_transition_to(Reconnecting));
        assert!(!Disrupted.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Reconnecting));
    }

    #[test]
    fn test_any_state_can_close() {
        for state in [Active, Disrupted, Reconnecting, Closed] {
            assert!(state.can_transition_to(Closed));
        }
        assert!(Closed.is_closed());
        assert!(!Active.is_closed());
    }
}
