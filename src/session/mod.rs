//! Session Layer
//!
//! Presenters that connect the liveness and credential pipelines to the
//! verification gateway and the UI. This layer is asynchronous; all
//! decision logic lives in `liveness/` and `credential/`.

pub mod gateway;
pub mod orchestrator;
pub mod protocol;
pub mod scan;

pub use gateway::{SimulatedGateway, VerificationGateway};
pub use orchestrator::{FaceSession, SessionConfig, SessionError, SessionId};
pub use protocol::UiEvent;
pub use scan::{ScanResult, ScanSession};
