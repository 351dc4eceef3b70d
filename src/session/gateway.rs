//! Verification Gateway
//!
//! The external collaborator that accepts a completed pose sequence and
//! answers with a [`VerificationOutcome`]. Implementations resolve exactly
//! once; callers may cancel before resolution, in which case the outcome
//! is never delivered.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::liveness::outcome::{VerificationFailure, VerificationOutcome};

/// Asynchronous face verification backend.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Verify the completed sequence.
    async fn verify(&self) -> VerificationOutcome;
}

/// Stand-in gateway that answers after a fixed delay.
///
/// Used by the demo binary and tests in place of a real backend.
#[derive(Clone, Debug)]
pub struct SimulatedGateway {
    latency: Duration,
    failure: Option<VerificationFailure>,
}

impl SimulatedGateway {
    /// Default simulated latency.
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(2);

    /// Gateway that accepts every face after `latency`.
    pub fn succeeding(latency: Duration) -> Self {
        Self {
            latency,
            failure: None,
        }
    }

    /// Gateway that rejects every face with `reason` after `latency`.
    pub fn failing(latency: Duration, reason: VerificationFailure) -> Self {
        Self {
            latency,
            failure: Some(reason),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::succeeding(Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl VerificationGateway for SimulatedGateway {
    async fn verify(&self) -> VerificationOutcome {
        debug!("Simulated verification, answering in {:?}", self.latency);
        tokio::time::sleep(self.latency).await;

        match &self.failure {
            Some(reason) => VerificationOutcome::failure(reason.clone()),
            None => VerificationOutcome::success(format!("fv-{}", uuid::Uuid::new_v4())),
        }
    }
}
