//! Liveness State and Pose Types
//!
//! The closed set of challenge states, the per-frame pose observation,
//! and the rotation threshold that separates "turned" from "centered".

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::DEFAULT_ROTATION_THRESHOLD_DEGREES;

// =============================================================================
// LIVENESS STATE
// =============================================================================

/// Current step of the head-pose liveness challenge.
///
/// The challenge walks `Preparation -> RotateRight -> RotateLeft -> FaceForward`
/// and ends in either `Success` or `Failed` once the verification call resolves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LivenessState {
    /// Waiting for the user to start the challenge.
    #[default]
    Preparation,
    /// User must turn their head to the right.
    RotateRight,
    /// User must turn their head to the left.
    RotateLeft,
    /// User must look straight at the camera.
    FaceForward,
    /// Verification accepted.
    Success,
    /// Verification rejected. Only an explicit retry leaves this state.
    Failed,
}

impl LivenessState {
    /// States in which pose observations are consumed.
    pub fn accepts_pose(self) -> bool {
        matches!(self, Self::RotateRight | Self::RotateLeft | Self::FaceForward)
    }

    /// States reached only through a verification outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether the primary action (start / continue) is available.
    pub fn is_action_enabled(self) -> bool {
        matches!(self, Self::Preparation | Self::Success)
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparation => "preparation",
            Self::RotateRight => "rotate_right",
            Self::RotateLeft => "rotate_left",
            Self::FaceForward => "face_forward",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// POSE OBSERVATION
// =============================================================================

/// A single face pose reading from the external detector.
///
/// Produced once per camera frame and consumed immediately.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    /// Rotation around the vertical axis. Positive is the user's right.
    pub yaw_radians: f64,
}

impl PoseObservation {
    /// Create an observation from a yaw angle in radians.
    pub const fn new(yaw_radians: f64) -> Self {
        Self { yaw_radians }
    }

    /// Create an observation from a yaw angle in degrees.
    pub fn from_degrees(yaw_degrees: f64) -> Self {
        Self::new(yaw_degrees.to_radians())
    }
}

// =============================================================================
// ROTATION THRESHOLD
// =============================================================================

/// Angle (radians) beyond which a pose counts as "rotated".
///
/// Always finite and strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationThreshold(f64);

impl RotationThreshold {
    /// Build a threshold from radians.
    pub fn from_radians(radians: f64) -> Result<Self, ThresholdError> {
        if !radians.is_finite() {
            return Err(ThresholdError::NotFinite);
        }
        if radians <= 0.0 {
            return Err(ThresholdError::NotPositive(radians));
        }
        Ok(Self(radians))
    }

    /// Build a threshold from degrees.
    pub fn from_degrees(degrees: f64) -> Result<Self, ThresholdError> {
        Self::from_radians(degrees.to_radians())
    }

    /// Threshold in radians.
    #[inline]
    pub fn radians(&self) -> f64 {
        self.0
    }

    /// Threshold in degrees.
    pub fn degrees(&self) -> f64 {
        self.0.to_degrees()
    }
}

impl Default for RotationThreshold {
    fn default() -> Self {
        Self(DEFAULT_ROTATION_THRESHOLD_DEGREES.to_radians())
    }
}

/// Rotation threshold errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    /// Threshold is NaN or infinite.
    #[error("rotation threshold must be finite")]
    NotFinite,
    /// Threshold is zero or negative.
    #[error("rotation threshold must be positive, got {0} rad")]
    NotPositive(f64),
    /// Configured value could not be parsed.
    #[error("invalid rotation threshold {0:?}")]
    Unparseable(String),
}

// =============================================================================
// TESTS
// =============================================================================
