//! QR Scan Session
//!
//! Feeds scanned QR strings to the [`CredentialDecoder`] and reports each
//! result to the UI exactly once. Decoding is synchronous; concurrent scans
//! on the same session are rejected rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credential::{Credential, CredentialDecoder, DecodeError, EncryptedCredentialPayload};
use crate::session::orchestrator::{SessionConfig, SessionError, SessionId};
use crate::session::protocol::UiEvent;

/// Result of a single scan attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// Payload decoded.
    Decoded(Credential),
    /// Payload rejected; a new scan is required.
    Rejected(DecodeError),
}

/// Presenter for one QR scanning screen.
pub struct ScanSession {
    id: SessionId,
    decoder: Arc<CredentialDecoder>,
    scanning: AtomicBool,
    completed: AtomicBool,
    closed: AtomicBool,
    event_tx: broadcast::Sender<UiEvent>,
}

impl ScanSession {
    /// Create a scan session sharing `decoder`.
    pub fn new(config: &SessionConfig, decoder: Arc<CredentialDecoder>) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let id = Uuid::new_v4();
        info!("Scan session {} created", id);

        Self {
            id,
            decoder,
            scanning: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
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

    /// Whether a credential has already been scanned.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Decode one scanned payload.
    ///
    /// Emits `CredentialScanned` or `ScanFailed`. After a successful scan the
    /// session stops accepting payloads.
    pub fn scan(
        &self,
        payload: impl Into<EncryptedCredentialPayload>,
    ) -> Result<ScanResult, SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        if self.is_completed() {
            debug!("Scan session {} already completed, ignoring payload", self.id);
            return Err(SessionError::ScanCompleted);
        }
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::ScanInProgress);
        }
        // Another scan may have completed between the check above and the claim.
        if self.is_completed() {
            self.scanning.store(false, Ordering::Release);
            return Err(SessionError::ScanCompleted);
        }

        let result = match self.decoder.decode(payload.into()) {
            Ok(credential) => {
                info!("Scan session {} decoded a credential", self.id);
                self.completed.store(true, Ordering::Release);
                let _ = self.event_tx.send(UiEvent::CredentialScanned {
                    credential: credential.clone(),
                });
                ScanResult::Decoded(credential)
            }
            Err(error) => {
                warn!("Scan session {} rejected payload: {}", self.id, error);
                let _ = self.event_tx.send(error.clone().into());
                ScanResult::Rejected(error)
            }
        };

        self.scanning.store(false, Ordering::Release);
        Ok(result)
    }

    /// Stop accepting payloads.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Scan session {} closed", self.id);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
