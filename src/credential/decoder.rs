//! QR Credential Decoder
//!
//! Turns a scanned QR string into a [`Credential`]:
//!
//! 1. base64 decode -> ciphertext
//! 2. RSA public-key operation + PKCS#1 v1.5 unpadding -> plaintext
//! 3. base64 decode -> JSON bytes
//! 4. JSON parse -> `user_image`, `username`, `privy_id`
//!
//! Each stage short-circuits on the first failure. The decoder holds only
//! the immutable public key, so it is `Send + Sync` and can run anywhere.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::credential::key::{fingerprint, load_public_key, public_decrypt, KeyError};

/// Environment variable holding the credential public key.
pub const PUBLIC_KEY_ENV: &str = "CREDENTIAL_PUBLIC_KEY";

/// Standard alphabet; trailing `=` optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// JSON key for the profile image URL.
pub const FIELD_USER_IMAGE: &str = "user_image";
/// JSON key for the display name.
pub const FIELD_USERNAME: &str = "username";
/// JSON key for the Privy account id.
pub const FIELD_PRIVY_ID: &str = "privy_id";

/// Decoder configuration.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// RSA public key as PEM (SPKI or PKCS#1) or bare base64 DER.
    pub public_key: String,
}

impl DecoderConfig {
    /// Create config with the given key material.
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Option<Self> {
        std::env::var(PUBLIC_KEY_ENV).ok().map(Self::new)
    }
}

/// Credential decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload or decrypted content is not valid base64.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Key is unusable or the RSA operation rejected the ciphertext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    /// Decoded content is not JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// A required field is absent or not a string.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl From<KeyError> for DecodeError {
    fn from(err: KeyError) -> Self {
        DecodeError::DecryptionFailed(err.to_string())
    }
}

/// Opaque string read from a QR code.
///
/// Consumed by [`CredentialDecoder::decode`]; a new scan is needed to retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedCredentialPayload(String);

impl EncryptedCredentialPayload {
    /// Wrap scanned text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Scanned text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EncryptedCredentialPayload {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for EncryptedCredentialPayload {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Identity record recovered from a QR payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    user_image_url: String,
    username: String,
    privy_id: String,
}

impl Credential {
    /// Profile image URL.
    pub fn user_image_url(&self) -> &str {
        &self.user_image_url
    }

    /// Display name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Privy account id.
    pub fn privy_id(&self) -> &str {
        &self.privy_id
    }

    /// Extract the required fields from parsed JSON.
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let object = value
            .as_object()
            .ok_or(DecodeError::MissingField(FIELD_USER_IMAGE))?;

        Ok(Self {
            user_image_url: required_string(object, FIELD_USER_IMAGE)?,
            username: required_string(object, FIELD_USERNAME)?,
            privy_id: required_string(object, FIELD_PRIVY_ID)?,
        })
    }
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, DecodeError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(DecodeError::MissingField(field))
}

/// Decodes scanned QR payloads with a fixed public key.
#[derive(Clone, Debug)]
pub struct CredentialDecoder {
    key: RsaPublicKey,
    fingerprint: String,
}

impl CredentialDecoder {
    /// Build a decoder from configuration.
    ///
    /// Unusable key material is reported as [`DecodeError::DecryptionFailed`].
    pub fn new(config: &DecoderConfig) -> Result<Self, DecodeError> {
        let key = load_public_key(&config.public_key)?;
        Ok(Self::from_public_key(key))
    }

    /// Build a decoder from an already parsed key.
    pub fn from_public_key(key: RsaPublicKey) -> Self {
        let fingerprint = fingerprint(&key);
        info!(
            "Credential decoder ready: {}-bit key, fingerprint {}",
            key.size() * 8,
            &fingerprint[..16]
        );
        Self { key, fingerprint }
    }

    /// Hex SHA-256 fingerprint of the public key.
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Run the full pipeline on a scanned payload.
    pub fn decode(&self, payload: EncryptedCredentialPayload) -> Result<Credential, DecodeError> {
        let ciphertext = PAYLOAD_ENGINE
            .decode(payload.as_str().trim())
            .map_err(|e| DecodeError::MalformedPayload(format!("payload is not base64: {}", e)))?;

        let plaintext = public_decrypt(&self.key, &ciphertext)?;

        let json = PAYLOAD_ENGINE
            .decode(&plaintext)
            .map_err(|e| DecodeError::MalformedPayload(format!("content is not base64: {}", e)))?;

        let value: Value = serde_json::from_slice(&json)
            .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let credential = Credential::from_json(&value)?;
        debug!("Decoded credential with key {}", &self.fingerprint[..16]);
        Ok(credential)
    }

    /// Convenience wrapper over [`decode`](Self::decode) for raw scan text.
    pub fn decode_str(&self, raw: &str) -> Result<Credential, DecodeError> {
        self.decode(EncryptedCredentialPayload::from(raw))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::key::tests::{private_encrypt, PUBLIC_PEM, PUBLIC_PKCS1_PEM};
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    fn decoder() -> CredentialDecoder {
        CredentialDecoder::new(&DecoderConfig::new(PUBLIC_PEM)).unwrap()
    }

    /// base64(private_op(base64(json)))
    fn build_payload(json: &str) -> String {
        let inner = STANDARD.encode(json.as_bytes());
        STANDARD.encode(private_encrypt(inner.as_bytes()))
    }

    #[test]
    fn test_decode_valid_payload() {
        let payload = build_payload(r#"{"user_image":"u","username":"n","privy_id":"p"}"#);
        let credential = decoder().decode_str(&payload).unwrap();

        assert_eq!(credential.user_image_url(), "u");
        assert_eq!(credential.username(), "n");
        assert_eq!(credential.privy_id(), "p");
    }

    #[test]
    fn test_decode_ignores_extra_fields_and_whitespace() {
        let body = json!({
            "user_image": "https://cdn.example.com/a.png",
            "username": "alice",
            "privy_id": "did:privy:123",
            "issued_at": 1724800000,
        })
        .to_string();
        let payload = format!("  {}\n", build_payload(&body));

        let credential = decoder().decode_str(&payload).unwrap();
        assert_eq!(credential.username(), "alice");
        assert_eq!(credential.privy_id(), "did:privy:123");
    }

    #[test]
    fn test_decode_with_pkcs1_key() {
        let decoder = CredentialDecoder::new(&DecoderConfig::new(PUBLIC_PKCS1_PEM)).unwrap();
        let payload = build_payload(r#"{"user_image":"u","username":"n","privy_id":"p"}"#);
        assert!(decoder.decode_str(&payload).is_ok());
    }

    #[test]
    fn test_decode_is_repeatable() {
        let decoder = decoder();
        let payload = build_payload(r#"{"user_image":"u","username":"n","privy_id":"p"}"#);
        assert_eq!(decoder.decode_str(&payload), decoder.decode_str(&payload));
    }

    #[test]
    fn test_non_base64_payload() {
        let result = decoder().decode_str("this is not base64!");
        assert!(matches!(result, Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_wrong_sized_ciphertext() {
        let payload = STANDARD.encode([7u8; 32]);
        let result = decoder().decode_str(&payload);
        assert!(matches!(result, Err(DecodeError::DecryptionFailed(_))));
    }

    #[test]
    fn test_plaintext_not_base64() {
        let payload = STANDARD.encode(private_encrypt(b"{not base64}"));
        let result = decoder().decode_str(&payload);
        assert!(matches!(result, Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_plaintext_not_json() {
        let payload = build_payload("definitely not json");
        let result = decoder().decode_str(&payload);
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_missing_privy_id() {
        let payload = build_payload(r#"{"user_image":"u","username":"n"}"#);
        let result = decoder().decode_str(&payload);
        assert_eq!(result, Err(DecodeError::MissingField(FIELD_PRIVY_ID)));
    }

    #[test]
    fn test_non_string_field() {
        let payload = build_payload(r#"{"user_image":"u","username":42,"privy_id":"p"}"#);
        let result = decoder().decode_str(&payload);
        assert_eq!(result, Err(DecodeError::MissingField(FIELD_USERNAME)));
    }

    #[test]
    fn test_json_not_an_object() {
        let payload = build_payload(r#"["u","n","p"]"#);
        let result = decoder().decode_str(&payload);
        assert!(matches!(result, Err(DecodeError::MissingField(_))));
    }

    #[test]
    fn test_malformed_key_is_decryption_failure() {
        let pem = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----";
        let result = CredentialDecoder::new(&DecoderConfig::new(pem));
        assert!(matches!(result, Err(DecodeError::DecryptionFailed(_))));
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_decode_logs_key_not_identity() {
        let decoder = decoder();
        let payload = build_payload(
            r#"{"user_image":"u","username":"alice","privy_id":"did:privy:secret-42"}"#,
        );

        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            decoder.decode_str(&payload).unwrap();
        });

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains(&decoder.key_fingerprint()[..16]));
        assert!(!logs.contains("did:privy:secret-42"));
        assert!(!logs.contains("alice"));
    }

    #[test]
    fn test_decoder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialDecoder>();
    }
}
