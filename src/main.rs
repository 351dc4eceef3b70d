//! Privy Verify Demo
//!
//! Drives one scripted liveness session against a simulated gateway and,
//! when `CREDENTIAL_PUBLIC_KEY` and `QR_PAYLOAD` are set, decodes a QR
//! payload with the configured key.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use privy_verify::{
    credential::{CredentialDecoder, DecoderConfig},
    liveness::{LivenessConfig, LivenessState, PoseObservation},
    session::{FaceSession, ScanResult, ScanSession, SessionConfig, SimulatedGateway},
    UiEvent, VERSION,
};

/// Environment variable holding a QR payload to decode.
const QR_PAYLOAD_ENV: &str = "QR_PAYLOAD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Privy Verify v{}", VERSION);

    let config = SessionConfig {
        liveness: LivenessConfig::from_env()?,
        ..Default::default()
    };
    info!(
        "Rotation threshold: {:.1} degrees",
        config.liveness.rotation_threshold.degrees()
    );

    demo_liveness(config.clone()).await?;
    demo_scan(&config)?;

    Ok(())
}

/// Run a scripted head-pose sequence.
async fn demo_liveness(config: SessionConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Liveness Session ===");

    let gateway = Arc::new(SimulatedGateway::succeeding(Duration::from_millis(500)));
    let session = FaceSession::new(config, gateway);
    let mut events = session.subscribe();

    session.perform_action().await?;

    // Simulated detector readings (degrees): drift, turn right, turn left, center.
    let script = [0.0, 20.0, 60.0, 10.0, -30.0, -70.0, -20.0, 5.0, 0.0, 0.0];
    for yaw in script {
        let emitted = session.submit_pose(PoseObservation::from_degrees(yaw)).await?;
        info!("Pose {:>6.1} deg -> {} event(s)", yaw, emitted.len());
    }

    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(UiEvent::StateChanged { state, action_enabled })) => {
                info!("State: {} (action enabled: {})", state, action_enabled);
                if state.is_terminal() {
                    break;
                }
            }
            Ok(Ok(event)) => info!("Event: {:?}", event),
            Ok(Err(e)) => {
                warn!("Event stream error: {}", e);
                break;
            }
            Err(_) => {
                warn!("Timed out waiting for verification");
                break;
            }
        }
    }

    if session.state().await == LivenessState::Success {
        info!("Face verified");
    }
    session.close().await;
    Ok(())
}

/// Decode a QR payload from the environment, if configured.
fn demo_scan(config: &SessionConfig) -> anyhow::Result<()> {
    let (Some(decoder_config), Ok(payload)) =
        (DecoderConfig::from_env(), std::env::var(QR_PAYLOAD_ENV))
    else {
        info!("Set CREDENTIAL_PUBLIC_KEY and {} to decode a QR payload", QR_PAYLOAD_ENV);
        return Ok(());
    };

    info!("=== Decoding QR Payload ===");
    let decoder = CredentialDecoder::new(&decoder_config)?;
    info!("Public key fingerprint: {}", decoder.key_fingerprint());
    let session = ScanSession::new(config, Arc::new(decoder));

    match session.scan(payload)? {
        ScanResult::Decoded(credential) => {
            info!(
                "Credential: username={} privy_id={} image={}",
                credential.username(),
                credential.privy_id(),
                credential.user_image_url()
            );
        }
        ScanResult::Rejected(error) => warn!("QR payload rejected: {}", error),
    }

    Ok(())
}
