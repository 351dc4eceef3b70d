//! Face Verification Session
//!
//! Wires pose observations into the liveness state machine, dispatches the
//! verification call when the sequence completes, and forwards every
//! resulting change to the UI as a [`UiEvent`].
//!
//! Pose submissions and outcome delivery lock the same mutex, so they never
//! interleave. While a verification is in flight incoming frames are dropped.

use std::sync::{Arc, PoisonError, Weak};

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::liveness::{
    LivenessConfig, LivenessEvent, LivenessState, LivenessStateMachine, MachineError,
    PoseObservation, VerificationOutcome,
};
use crate::session::gateway::VerificationGateway;
use crate::session::protocol::UiEvent;

/// Unique session identifier.
pub type SessionId = Uuid;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Liveness challenge settings.
    pub liveness: LivenessConfig,
    /// Capacity of the UI event channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness: LivenessConfig::default(),
            event_capacity: 64,
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The state machine rejected the operation.
    #[error(transparent)]
    Machine(#[from] MachineError),

    /// Another scan on this session is still being decoded.
    #[error("Scan already in progress")]
    ScanInProgress,

    /// A credential was already scanned on this session.
    #[error("Scan already completed")]
    ScanCompleted,

    /// Session has been closed.
    #[error("Session closed")]
    Closed,
}

/// State guarded by the session mutex.
struct FaceSessionInner {
    machine: LivenessStateMachine,
    closed: bool,
}

/// Presenter for one face verification attempt.
pub struct FaceSession {
    id: SessionId,
    inner: Arc<Mutex<FaceSessionInner>>,
    /// Outstanding verification task. Kept outside `inner` so teardown can
    /// always reach it without awaiting.
    pending: std::sync::Mutex<Option<JoinHandle<()>>>,
    gateway: Arc<dyn VerificationGateway>,
    event_tx: broadcast::Sender<UiEvent>,
}

impl FaceSession {
    /// Create a new session using `gateway` for verification calls.
    pub fn new(config: SessionConfig, gateway: Arc<dyn VerificationGateway>) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let id = Uuid::new_v4();
        info!("Face session {} created", id);

        Self {
            id,
            inner: Arc::new(Mutex::new(FaceSessionInner {
                machine: LivenessStateMachine::new(config.liveness),
                closed: false,
            })),
            pending: std::sync::Mutex::new(None),
            gateway,
            event_tx,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Subscribe to UI events.
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.event_tx.subscribe()
    }

    /// Current liveness state.
    pub async fn state(&self) -> LivenessState {
        self.inner.lock().await.machine.state()
    }

    /// Whether a verification call is outstanding.
    pub async fn verification_in_flight(&self) -> bool {
        self.inner.lock().await.machine.verification_in_flight()
    }

    /// Whether the primary action button is enabled.
    pub async fn is_action_enabled(&self) -> bool {
        self.inner.lock().await.machine.is_action_enabled()
    }

    /// Handle the primary action button.
    ///
    /// Starts the challenge from `Preparation`, moves on from `Success`, and
    /// retries from `Failed`. Ignored in every other state.
    pub async fn perform_action(&self) -> Result<Vec<LivenessEvent>, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(SessionError::Closed);
        }
        if inner.machine.verification_in_flight() {
            return Ok(Vec::new());
        }

        let events = match inner.machine.state() {
            LivenessState::Preparation => inner.machine.begin()?,
            LivenessState::Failed => {
                info!("Session {} retrying liveness challenge", self.id);
                inner.machine.retry()?
            }
            LivenessState::Success => {
                self.publish(UiEvent::NavigateNext);
                Vec::new()
            }
            _ => Vec::new(),
        };

        self.publish_all(&events);
        Ok(events)
    }

    /// Feed one pose observation from the face detector.
    ///
    /// Never waits on the gateway: a completed sequence spawns the
    /// verification call and returns immediately.
    pub async fn submit_pose(
        &self,
        pose: PoseObservation,
    ) -> Result<Vec<LivenessEvent>, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(SessionError::Closed);
        }

        let events = inner.machine.submit_pose(pose);
        if events.contains(&LivenessEvent::VerificationRequested) {
            let handle = self.spawn_verification();
            *self.lock_pending() = Some(handle);
        }

        self.publish_all(&events);
        Ok(events)
    }

    /// Detach from any outstanding verification.
    ///
    /// The pending call is cancelled and a late outcome is ignored.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        if self.abort_pending() {
            debug!("Session {} cancelled pending verification", self.id);
        }
        info!("Face session {} closed", self.id);
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Abort the outstanding verification task, if any.
    fn abort_pending(&self) -> bool {
        match self.lock_pending().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn spawn_verification(&self) -> JoinHandle<()> {
        let id = self.id;
        let gateway = Arc::clone(&self.gateway);
        let inner = Arc::downgrade(&self.inner);
        let event_tx = self.event_tx.clone();

        info!("Session {} dispatching verification", id);
        tokio::spawn(async move {
            let outcome = gateway.verify().await;
            deliver_outcome(id, &inner, &event_tx, outcome).await;
        })
    }

    fn publish(&self, event: UiEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }

    fn publish_all(&self, events: &[LivenessEvent]) {
        for event in events {
            self.publish(event.clone().into());
        }
    }
}

/// Apply a gateway answer unless the session is gone or closed.
async fn deliver_outcome(
    id: SessionId,
    inner: &Weak<Mutex<FaceSessionInner>>,
    event_tx: &broadcast::Sender<UiEvent>,
    outcome: VerificationOutcome,
) {
    let Some(inner) = inner.upgrade() else {
        debug!("Session {} dropped before verification resolved", id);
        return;
    };

    let mut inner = inner.lock().await;
    if inner.closed {
        debug!("Session {} closed, ignoring late verification outcome", id);
        return;
    }

    let events = match inner.machine.on_verification_outcome(&outcome) {
        Ok(events) => events,
        Err(e) => {
            warn!("Session {} discarded verification outcome: {}", id, e);
            return;
        }
    };

    info!("Session {} verification resolved: success={}", id, outcome.is_success());
    let navigate = outcome.is_success();
    let _ = event_tx.send(UiEvent::VerificationFinished { outcome });
    for event in events {
        let _ = event_tx.send(event.into());
    }
    if navigate {
        let _ = event_tx.send(UiEvent::NavigateNext);
    }
}

impl Drop for FaceSession {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

// =============================================================================
// TESTS
// =============================================================================
