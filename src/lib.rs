//! # Privy Verify
//!
//! Head-pose liveness challenge and QR credential decoding, independent of
//! any camera or UI toolkit.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PRIVY VERIFY                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  liveness/       - Pose challenge (pure, synchronous)        │
//! │  ├── state.rs    - States, pose observation, threshold       │
//! │  ├── transition.rs - Pure pose transition function           │
//! │  ├── machine.rs  - State machine + verification gate         │
//! │  ├── events.rs   - Events returned to observers              │
//! │  └── outcome.rs  - Verification results                      │
//! │                                                              │
//! │  credential/     - QR payload decoding (pure, synchronous)   │
//! │  ├── key.rs      - RSA public key + PKCS#1 v1.5 unpadding    │
//! │  └── decoder.rs  - base64 -> RSA -> base64 -> JSON pipeline  │
//! │                                                              │
//! │  session/        - Presenters (async)                        │
//! │  ├── gateway.rs  - Verification gateway contract             │
//! │  ├── orchestrator.rs - Face verification session             │
//! │  ├── scan.rs     - QR scan session                           │
//! │  └── protocol.rs - UI event types                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! Pose observations go through [`LivenessStateMachine`]; once the user has
//! turned right, left and back to center, the [`FaceSession`] issues exactly
//! one call to its [`VerificationGateway`] and reports the result as
//! [`UiEvent`]s. QR strings go through [`CredentialDecoder`] and come back
//! as a [`Credential`] or a typed [`DecodeError`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod credential;
pub mod liveness;
pub mod session;

// Re-export commonly used types
pub use credential::{Credential, CredentialDecoder, DecodeError, DecoderConfig};
pub use liveness::{
    LivenessConfig, LivenessEvent, LivenessState, LivenessStateMachine, RotationThreshold,
    VerificationOutcome,
};
pub use session::{FaceSession, ScanSession, SessionConfig, UiEvent, VerificationGateway};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default rotation threshold (degrees).
pub const DEFAULT_ROTATION_THRESHOLD_DEGREES: f64 = 45.0;
