//! Liveness Challenge
//!
//! Head-pose challenge: the user turns right, then left, then faces the
//! camera before a verification call is issued.
//!
//! ## Module Structure
//!
//! - `state`: Challenge states, pose observations, rotation threshold
//! - `transition`: Pure pose transition function
//! - `machine`: Stateful wrapper with the verification gate
//! - `events`: Events returned to observers
//! - `outcome`: Verification gateway results

pub mod events;
pub mod machine;
pub mod outcome;
pub mod state;
pub mod transition;

// Re-export key types
pub use events::LivenessEvent;
pub use machine::{LivenessConfig, LivenessStateMachine, MachineError};
pub use outcome::{VerificationFailure, VerificationOutcome};
pub use state::{LivenessState, PoseObservation, RotationThreshold, ThresholdError};
pub use transition::{transition, Transition};
