//! Verification Outcome
//!
//! Result delivered by the verification gateway once the pose sequence
//! has been completed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the gateway declined a verification.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VerificationFailure {
    /// The verification backend did not answer in time.
    #[error("Request timeout")]
    Timeout,
    /// The submitted face could not be matched.
    #[error("Face can't be identified")]
    FaceUnidentified,
    /// Any other gateway-reported reason.
    #[error("{0}")]
    Other(String),
}

/// Resolution of a single verification call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    /// Face verified; `token` identifies the accepted verification.
    Success {
        /// Opaque token returned by the gateway.
        token: String,
    },
    /// Face rejected.
    Failure {
        /// Reason reported by the gateway.
        reason: VerificationFailure,
    },
}

impl VerificationOutcome {
    /// Successful outcome with `token`.
    pub fn success(token: impl Into<String>) -> Self {
        Self::Success { token: token.into() }
    }

    /// Failed outcome with `reason`.
    pub fn failure(reason: VerificationFailure) -> Self {
        Self::Failure { reason }
    }

    /// Whether the face was verified.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
