//! UI Notification Types
//!
//! Everything the rendering layer observes is delivered as a [`UiEvent`].

use serde::Serialize;

use crate::credential::{Credential, DecodeError};
use crate::liveness::{LivenessEvent, LivenessState, VerificationOutcome};

/// Notification sent to the UI collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Liveness state changed.
    StateChanged {
        /// New state.
        state: LivenessState,
        /// Whether the primary action button is enabled.
        action_enabled: bool,
    },

    /// A verification call was issued (show progress).
    VerificationStarted,

    /// The verification call resolved (hide progress).
    VerificationFinished {
        /// Gateway answer.
        outcome: VerificationOutcome,
    },

    /// Move on to the next screen.
    NavigateNext,

    /// A QR payload decoded successfully.
    CredentialScanned {
        /// Decoded credential.
        credential: Credential,
    },

    /// A QR payload could not be decoded.
    ScanFailed {
        /// Human readable reason.
        reason: String,
        /// Typed failure.
        #[serde(skip)]
        error: DecodeError,
    },
}

impl From<LivenessEvent> for UiEvent {
    fn from(event: LivenessEvent) -> Self {
        match event {
            LivenessEvent::StateChanged { state, action_enabled } => {
                UiEvent::StateChanged { state, action_enabled }
            }
            LivenessEvent::VerificationRequested => UiEvent::VerificationStarted,
        }
    }
}

impl From<DecodeError> for UiEvent {
    fn from(error: DecodeError) -> Self {
        UiEvent::ScanFailed {
            reason: error.to_string(),
            error,
        }
    }
}
