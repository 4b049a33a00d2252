//! Agent status state machine
//!
//! Replaces the ad-hoc "last writer wins" status field with an explicit
//! transition table. Illegal transitions are rejected, not overwritten.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Created, never started
    Idle,
    /// Browser launch and navigation in progress
    Starting,
    /// Joined the room, session live
    Running,
    /// Torn down (terminal until restarted)
    Stopped,
    /// Start failed; cleanup transitions to Stopped
    Error,
}

impl AgentStatus {
    /// Transition table:
    /// `{Idle, Stopped} --start--> Starting --success--> Running`,
    /// `Starting --failure--> Error --cleanup--> Stopped`,
    /// `any --stop--> Stopped`.
    pub fn can_transition_to(self, to: AgentStatus) -> bool {
        match to {
            AgentStatus::Stopped => true,
            AgentStatus::Starting => matches!(self, AgentStatus::Idle | AgentStatus::Stopped),
            AgentStatus::Running | AgentStatus::Error => matches!(self, AgentStatus::Starting),
            // Idle is the creation state, never a transition target
            AgentStatus::Idle => false,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AgentStatus::Idle => 0,
            AgentStatus::Starting => 1,
            AgentStatus::Running => 2,
            AgentStatus::Stopped => 3,
            AgentStatus::Error => 4,
        }
    }

    fn from_u8(v: u8) -> AgentStatus {
        match v {
            0 => AgentStatus::Idle,
            1 => AgentStatus::Starting,
            2 => AgentStatus::Running,
            3 => AgentStatus::Stopped,
            _ => AgentStatus::Error,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A transition that the table does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal status transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// Status the agent was in
    pub from: AgentStatus,
    /// Status the caller asked for
    pub to: AgentStatus,
}

/// Lock-free status holder shared between the registry and the agent.
///
/// Status reads (list/status endpoints) must not contend with a lifecycle
/// operation holding the per-agent mutex, so the status lives outside it.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// Create a cell holding `status`
    pub fn new(status: AgentStatus) -> Self {
        Self(AtomicU8::new(status.as_u8()))
    }

    /// Read the current status
    pub fn get(&self) -> AgentStatus {
        AgentStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Apply a transition, returning the previous status.
    pub fn transition(&self, to: AgentStatus) -> Result<AgentStatus, IllegalTransition> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = AgentStatus::from_u8(current);
            if !from.can_transition_to(to) {
                return Err(IllegalTransition { from, to });
            }
            match self.0.compare_exchange_weak(
                current,
                to.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new(AgentStatus::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(AgentStatus::Idle.can_transition_to(AgentStatus::Starting));
        assert!(AgentStatus::Stopped.can_transition_to(AgentStatus::Starting));
        assert!(AgentStatus::Starting.can_transition_to(AgentStatus::Running));
        assert!(AgentStatus::Starting.can_transition_to(AgentStatus::Error));
        assert!(AgentStatus::Error.can_transition_to(AgentStatus::Stopped));
        // stop is legal from every state
        for s in [
            AgentStatus::Idle,
            AgentStatus::Starting,
            AgentStatus::Running,
            AgentStatus::Stopped,
            AgentStatus::Error,
        ] {
            assert!(s.can_transition_to(AgentStatus::Stopped));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!AgentStatus::Running.can_transition_to(AgentStatus::Starting));
        assert!(!AgentStatus::Idle.can_transition_to(AgentStatus::Running));
        assert!(!AgentStatus::Stopped.can_transition_to(AgentStatus::Running));
        assert!(!AgentStatus::Running.can_transition_to(AgentStatus::Error));
        assert!(!AgentStatus::Running.can_transition_to(AgentStatus::Idle));
    }

    #[test]
    fn test_cell_transition_sequence() {
        let cell = StatusCell::default();
        assert_eq!(cell.get(), AgentStatus::Idle);

        assert_eq!(
            cell.transition(AgentStatus::Starting).unwrap(),
            AgentStatus::Idle
        );
        cell.transition(AgentStatus::Running).unwrap();
        cell.transition(AgentStatus::Stopped).unwrap();
        cell.transition(AgentStatus::Starting).unwrap();
        cell.transition(AgentStatus::Error).unwrap();
        cell.transition(AgentStatus::Stopped).unwrap();
        assert_eq!(cell.get(), AgentStatus::Stopped);
    }

    #[test]
    fn test_cell_rejects_illegal() {
        let cell = StatusCell::default();
        let err = cell.transition(AgentStatus::Running).unwrap_err();
        assert_eq!(err.from, AgentStatus::Idle);
        assert_eq!(err.to, AgentStatus::Running);
        // cell unchanged after rejection
        assert_eq!(cell.get(), AgentStatus::Idle);
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&AgentStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let back: AgentStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, AgentStatus::Error);
    }
}
