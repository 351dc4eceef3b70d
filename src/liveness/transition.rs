//! Pose Transition Function
//!
//! Maps (current state, observed pose, threshold) to the next step of the
//! challenge. Pure: no I/O, no mutation. Triggering verification is signalled
//! through the return value and left to the caller.

use crate::liveness::state::{LivenessState, PoseObservation, RotationThreshold};

/// Result of applying one pose observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No transition defined for this input.
    Stay,
    /// Move to a new state.
    Advance(LivenessState),
    /// Face is centered in `FaceForward`: the sequence is complete and a
    /// verification call should be issued. The state itself does not change.
    RequestVerification,
}

/// Apply a pose observation to the current state.
///
/// | State        | Condition          | Result                |
/// |--------------|--------------------|-----------------------|
/// | RotateRight  | yaw > +threshold   | Advance(RotateLeft)   |
/// | RotateLeft   | yaw < -threshold   | Advance(FaceForward)  |
/// | FaceForward  | \|yaw\| <= threshold | RequestVerification |
/// | otherwise    |                    | Stay                  |
///
/// Both rotation comparisons are strict, so a yaw exactly at the threshold
/// does not count as rotated. NaN fails every comparison and yields `Stay`.
pub fn transition(
    state: LivenessState,
    pose: PoseObservation,
    threshold: RotationThreshold,
) -> Transition {
    let limit = threshold.radians();
    let yaw_radians = pose.yaw_radians;

    match state {
        LivenessState::RotateRight if yaw_radians > limit => {
            Transition::Advance(LivenessState::RotateLeft)
        }
        LivenessState::RotateLeft if yaw_radians < -limit => {
            Transition::Advance(LivenessState::FaceForward)
        }
        LivenessState::FaceForward if yaw_radians.abs() <= limit => {
            Transition::RequestVerification
        }
        _ => Transition::Stay,
    }
}

// =============================================================================
// TESTS
// =============================================================================
