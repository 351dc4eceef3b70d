//! Liveness State Machine
//!
//! Owns the single mutable challenge state and the in-flight flag that
//! gates pose processing while a verification call is outstanding.
//! Every operation returns the events it emitted; the machine holds no
//! reference to any observer.

use thiserror::Error;
use tracing::{debug, info};

use crate::liveness::events::LivenessEvent;
use crate::liveness::outcome::VerificationOutcome;
use crate::liveness::state::{LivenessState, PoseObservation, RotationThreshold, ThresholdError};
use crate::liveness::transition::{transition, Transition};

/// Environment variable holding the rotation threshold in degrees.
pub const THRESHOLD_ENV: &str = "LIVENESS_ROTATION_THRESHOLD_DEG";

/// Configuration for a liveness challenge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LivenessConfig {
    /// Yaw beyond which the head counts as rotated.
    pub rotation_threshold: RotationThreshold,
}

impl LivenessConfig {
    /// Create config from environment variables.
    ///
    /// Falls back to the default threshold when the variable is unset.
    pub fn from_env() -> Result<Self, ThresholdError> {
        match std::env::var(THRESHOLD_ENV) {
            Ok(raw) => Self::from_degrees_str(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a threshold given in degrees.
    pub fn from_degrees_str(raw: &str) -> Result<Self, ThresholdError> {
        let degrees: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ThresholdError::Unparseable(raw.to_string()))?;
        Ok(Self {
            rotation_threshold: RotationThreshold::from_degrees(degrees)?,
        })
    }
}

/// State machine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MachineError {
    /// Operation not allowed from the current state.
    #[error("operation not allowed in state {0}")]
    InvalidState(LivenessState),
    /// An outcome arrived with no verification outstanding.
    #[error("no verification pending")]
    NoVerificationPending,
    /// A verification call is still outstanding.
    #[error("verification in flight")]
    VerificationInFlight,
}

/// Sequences pose observations through [`transition`].
#[derive(Debug, Clone)]
pub struct LivenessStateMachine {
    state: LivenessState,
    verification_in_flight: bool,
    config: LivenessConfig,
}

impl LivenessStateMachine {
    /// Create a machine in `Preparation`.
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            state: LivenessState::Preparation,
            verification_in_flight: false,
            config,
        }
    }

    /// Current state.
    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// Whether a verification call is outstanding.
    pub fn verification_in_flight(&self) -> bool {
        self.verification_in_flight
    }

    /// Active configuration.
    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// Whether the primary action is available.
    pub fn is_action_enabled(&self) -> bool {
        !self.verification_in_flight && self.state.is_action_enabled()
    }

    /// Start the challenge: `Preparation -> RotateRight`.
    pub fn begin(&mut self) -> Result<Vec<LivenessEvent>, MachineError> {
        if self.state != LivenessState::Preparation {
            return Err(MachineError::InvalidState(self.state));
        }
        Ok(vec![self.set_state(LivenessState::RotateRight)])
    }

    /// Return to `Preparation`.
    ///
    /// Rejected while a verification call is outstanding.
    pub fn reset(&mut self) -> Result<Vec<LivenessEvent>, MachineError> {
        if self.verification_in_flight {
            return Err(MachineError::VerificationInFlight);
        }
        if self.state == LivenessState::Preparation {
            return Ok(Vec::new());
        }
        Ok(vec![self.set_state(LivenessState::Preparation)])
    }

    /// Reset and immediately re-arm the sequence.
    pub fn retry(&mut self) -> Result<Vec<LivenessEvent>, MachineError> {
        let mut events = self.reset()?;
        events.extend(self.begin()?);
        Ok(events)
    }

    /// Feed one pose observation.
    ///
    /// Dropped without effect while a verification call is outstanding or
    /// when the current state does not consume poses.
    pub fn submit_pose(&mut self, pose: PoseObservation) -> Vec<LivenessEvent> {
        if self.verification_in_flight || !self.state.accepts_pose() {
            return Vec::new();
        }

        match transition(self.state, pose, self.config.rotation_threshold) {
            Transition::Stay => Vec::new(),
            Transition::Advance(next) => vec![self.set_state(next)],
            Transition::RequestVerification => {
                self.verification_in_flight = true;
                info!("Pose sequence complete, requesting verification");
                vec![LivenessEvent::VerificationRequested]
            }
        }
    }

    /// Apply the gateway's answer to an outstanding verification.
    pub fn on_verification_outcome(
        &mut self,
        outcome: &VerificationOutcome,
    ) -> Result<Vec<LivenessEvent>, MachineError> {
        if !self.verification_in_flight {
            return Err(MachineError::NoVerificationPending);
        }
        self.verification_in_flight = false;

        let next = match outcome {
            VerificationOutcome::Success { .. } => LivenessState::Success,
            VerificationOutcome::Failure { reason } => {
                info!("Verification declined: {}", reason);
                LivenessState::Failed
            }
        };
        Ok(vec![self.set_state(next)])
    }

    fn set_state(&mut self, next: LivenessState) -> LivenessEvent {
        debug!("Liveness state {} -> {}", self.state, next);
        self.state = next;
        LivenessEvent::state_changed(next)
    }
}

impl Default for LivenessStateMachine {
    fn default() -> Self {
        Self::new(LivenessConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::outcome::VerificationFailure;

    const RIGHT: PoseObservation = PoseObservation::new(1.0);
    const LEFT: PoseObservation = PoseObservation::new(-1.0);
    const CENTER: PoseObservation = PoseObservation::new(0.0);

    fn started_machine() -> LivenessStateMachine {
        let mut machine = LivenessStateMachine::default();
        machine.begin().unwrap();
        machine
    }

    fn machine_awaiting_outcome() -> LivenessStateMachine {
        let mut machine = started_machine();
        machine.submit_pose(RIGHT);
        machine.submit_pose(LEFT);
        machine.submit_pose(CENTER);
        assert!(machine.verification_in_flight());
        machine
    }

    #[test]
    fn test_begin_moves_to_rotate_right() {
        let mut machine = LivenessStateMachine::default();
        let events = machine.begin().unwrap();
        assert_eq!(events, vec![LivenessEvent::state_changed(LivenessState::RotateRight)]);
        assert_eq!(machine.state(), LivenessState::RotateRight);
    }

    #[test]
    fn test_begin_rejected_outside_preparation() {
        let mut machine = started_machine();
        assert_eq!(machine.begin(), Err(MachineError::InvalidState(LivenessState::RotateRight)));
    }

    #[test]
    fn test_poses_ignored_in_preparation() {
        let mut machine = LivenessStateMachine::default();
        assert!(machine.submit_pose(RIGHT).is_empty());
        assert_eq!(machine.state(), LivenessState::Preparation);
    }

    #[test]
    fn test_full_sequence_emits_one_event_per_change() {
        let mut machine = started_machine();

        assert!(machine.submit_pose(CENTER).is_empty());
        assert_eq!(
            machine.submit_pose(RIGHT),
            vec![LivenessEvent::state_changed(LivenessState::RotateLeft)]
        );
        assert_eq!(
            machine.submit_pose(LEFT),
            vec![LivenessEvent::state_changed(LivenessState::FaceForward)]
        );
        assert_eq!(machine.submit_pose(CENTER), vec![LivenessEvent::VerificationRequested]);
        assert_eq!(machine.state(), LivenessState::FaceForward);
    }

    #[test]
    fn test_second_pose_while_in_flight_is_dropped() {
        let mut machine = machine_awaiting_outcome();
        assert!(machine.submit_pose(CENTER).is_empty());
        assert!(machine.submit_pose(RIGHT).is_empty());
        assert_eq!(machine.state(), LivenessState::FaceForward);
        assert!(machine.verification_in_flight());
    }

    #[test]
    fn test_success_outcome() {
        let mut machine = machine_awaiting_outcome();
        let events = machine
            .on_verification_outcome(&VerificationOutcome::success("token"))
            .unwrap();
        assert_eq!(events, vec![LivenessEvent::state_changed(LivenessState::Success)]);
        assert_eq!(machine.state(), LivenessState::Success);
        assert!(!machine.verification_in_flight());
        assert!(machine.is_action_enabled());
    }

    #[test]
    fn test_failure_outcome() {
        let mut machine = machine_awaiting_outcome();
        let outcome = VerificationOutcome::failure(VerificationFailure::FaceUnidentified);
        let events = machine.on_verification_outcome(&outcome).unwrap();
        assert_eq!(events, vec![LivenessEvent::state_changed(LivenessState::Failed)]);
        assert_eq!(machine.state(), LivenessState::Failed);
    }

    #[test]
    fn test_outcome_without_pending_verification_rejected() {
        let mut machine = started_machine();
        let result = machine.on_verification_outcome(&VerificationOutcome::success("token"));
        assert_eq!(result, Err(MachineError::NoVerificationPending));
        assert_eq!(machine.state(), LivenessState::RotateRight);
    }

    #[test]
    fn test_terminal_states_ignore_poses() {
        let mut machine = machine_awaiting_outcome();
        machine
            .on_verification_outcome(&VerificationOutcome::failure(VerificationFailure::Timeout))
            .unwrap();
        assert!(machine.submit_pose(RIGHT).is_empty());
        assert!(machine.submit_pose(CENTER).is_empty());
        assert_eq!(machine.state(), LivenessState::Failed);
    }

    #[test]
    fn test_reset_rejected_while_in_flight() {
        let mut machine = machine_awaiting_outcome();
        assert_eq!(machine.reset(), Err(MachineError::VerificationInFlight));
    }

    #[test]
    fn test_retry_after_failure_rearms_sequence() {
        let mut machine = machine_awaiting_outcome();
        machine
            .on_verification_outcome(&VerificationOutcome::failure(VerificationFailure::Timeout))
            .unwrap();

        let events = machine.retry().unwrap();
        assert_eq!(
            events,
            vec![
                LivenessEvent::state_changed(LivenessState::Preparation),
                LivenessEvent::state_changed(LivenessState::RotateRight),
            ]
        );
        assert_eq!(machine.submit_pose(RIGHT).len(), 1);
    }

    #[test]
    fn test_reset_in_preparation_emits_nothing() {
        let mut machine = LivenessStateMachine::default();
        assert!(machine.reset().unwrap().is_empty());
    }

    #[test]
    fn test_custom_threshold_is_respected() {
        let config = LivenessConfig::from_degrees_str("10").unwrap();
        let mut machine = LivenessStateMachine::new(config);
        machine.begin().unwrap();

        // 20 degrees clears a 10 degree threshold but not the default 45.
        let events = machine.submit_pose(PoseObservation::from_degrees(20.0));
        assert_eq!(events, vec![LivenessEvent::state_changed(LivenessState::RotateLeft)]);
    }

    #[test]
    fn test_config_parse_errors() {
        assert!(matches!(
            LivenessConfig::from_degrees_str("abc"),
            Err(ThresholdError::Unparseable(_))
        ));
        assert!(matches!(
            LivenessConfig::from_degrees_str("0"),
            Err(ThresholdError::NotPositive(_))
        ));
    }
}
