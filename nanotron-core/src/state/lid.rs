//! Lid state machine
//!
//! The lid position is never read back from the device. It changes only when
//! an explicit open or close command is confirmed, and drops back to
//! `Unknown` whenever the device link is lost or a lid command fails.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Thermal cycler lid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LidState {
    /// Not known since connect
    #[default]
    Unknown,
    Open,
    Closed,
}

/// Lid events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidEvent {
    /// Device confirmed an open command
    OpenConfirmed,
    /// Device confirmed a close command
    CloseConfirmed,
    /// A lid command failed partway
    CommandFailed,
    /// Device connected or disconnected
    LinkChanged,
}

impl LidState {
    /// Process an event and return the next state
    pub fn transition(self, event: LidEvent) -> Self {
        match event {
            LidEvent::OpenConfirmed => LidState::Open,
            LidEvent::CloseConfirmed => LidState::Closed,
            LidEvent::CommandFailed | LidEvent::LinkChanged => LidState::Unknown,
        }
    }

    /// Check if slots under the lid may be reached
    pub fn permits_gated_access(&self) -> bool {
        matches!(self, LidState::Open)
    }

    /// Check if an open request has anything to do
    pub fn needs_open(&self) -> bool {
        !matches!(self, LidState::Open)
    }
}

impl fmt::Display for LidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LidState::Unknown => "unknown",
            LidState::Open => "open",
            LidState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lid_transitions() {
        let state = LidState::default();
        assert_eq!(state, LidState::Unknown);
        assert!(!state.permits_gated_access());

        let state = state.transition(LidEvent::OpenConfirmed);
        assert_eq!(state, LidState::Open);
        assert!(state.permits_gated_access());
        assert!(!state.needs_open());

        let state = state.transition(LidEvent::CloseConfirmed);
        assert_eq!(state, LidState::Closed);
        assert!(state.needs_open());
    }

    #[test]
    fn test_failures_reset_to_unknown() {
        assert_eq!(
            LidState::Open.transition(LidEvent::CommandFailed),
            LidState::Unknown
        );
        assert_eq!(
            LidState::Closed.transition(LidEvent::LinkChanged),
            LidState::Unknown
        );
    }
}
