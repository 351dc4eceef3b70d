//! Liveness Events
//!
//! Events returned by the state machine. They are the only channel through
//! which observers learn about state changes.

use serde::{Deserialize, Serialize};

use crate::liveness::state::LivenessState;

/// Event emitted by [`LivenessStateMachine`](crate::liveness::LivenessStateMachine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessEvent {
    /// The machine moved to a new state.
    StateChanged {
        /// New state.
        state: LivenessState,
        /// Whether the primary action is available in the new state.
        action_enabled: bool,
    },

    /// The pose sequence is complete and exactly one verification call must
    /// be issued. Pose observations are dropped until the outcome arrives.
    VerificationRequested,
}

impl LivenessEvent {
    /// Build a state change event for `state`.
    pub fn state_changed(state: LivenessState) -> Self {
        Self::StateChanged {
            state,
            action_enabled: state.is_action_enabled(),
        }
    }

    /// New state carried by this event, if any.
    pub fn new_state(&self) -> Option<LivenessState> {
        match self {
            Self::StateChanged { state, .. } => Some(*state),
            Self::VerificationRequested => None,
        }
    }
}
