//! Public Key Handling
//!
//! Loads the embedded RSA public key and performs the raw public-key
//! operation used to open scanned payloads.
//!
//! NOTE: payloads are "decrypted" with the *public* key (`c^e mod n`
//! followed by PKCS#1 v1.5 unpadding). Anyone holding the public key can
//! open them, so this provides no confidentiality. It matches what issued
//! QR codes expect and must stay as-is until the issuer changes the format.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum PKCS#1 v1.5 padding string length.
const MIN_PADDING_LEN: usize = 8;

/// Block type written by private-key operations (0xFF padding).
const BLOCK_TYPE_PRIVATE: u8 = 0x01;

/// Block type written by encryption (random non-zero padding).
const BLOCK_TYPE_PUBLIC: u8 = 0x02;

/// Key loading and public-key operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Key material could not be parsed in any supported encoding.
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    /// Ciphertext length differs from the modulus length.
    #[error("ciphertext is {actual} bytes, key expects {expected}")]
    SizeMismatch {
        /// Modulus size in bytes.
        expected: usize,
        /// Received ciphertext size.
        actual: usize,
    },
    /// Ciphertext is not smaller than the modulus.
    #[error("ciphertext out of range for key")]
    OutOfRange,
    /// Recovered block is not valid PKCS#1 v1.5.
    #[error("invalid PKCS#1 v1.5 padding: {0}")]
    InvalidPadding(&'static str),
}

/// Parse RSA public key material.
///
/// Accepts SPKI PEM (`BEGIN PUBLIC KEY`), PKCS#1 PEM (`BEGIN RSA PUBLIC KEY`),
/// or bare base64 DER in either structure.
pub fn load_public_key(material: &str) -> Result<RsaPublicKey, KeyError> {
    let material = material.trim();

    if material.contains("-----BEGIN PUBLIC KEY-----") {
        return RsaPublicKey::from_public_key_pem(material)
            .map_err(|e| KeyError::InvalidKey(e.to_string()));
    }
    if material.contains("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(material)
            .map_err(|e| KeyError::InvalidKey(e.to_string()));
    }

    let compact: String = material.chars().filter(|c| !c.is_whitespace()).collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| KeyError::InvalidKey(format!("not PEM or base64 DER: {}", e)))?;

    RsaPublicKey::from_pkcs1_der(&der)
        .or_else(|_| RsaPublicKey::from_public_key_der(&der))
        .map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// SHA-256 fingerprint of the key modulus, hex encoded.
pub fn fingerprint(key: &RsaPublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.n().to_bytes_be());
    hasher.update(key.e().to_bytes_be());
    hex::encode(hasher.finalize())
}

/// Open `ciphertext` with the public key and strip PKCS#1 v1.5 padding.
pub fn public_decrypt(key: &RsaPublicKey, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
    let k = key.size();
    if ciphertext.len() != k {
        return Err(KeyError::SizeMismatch {
            expected: k,
            actual: ciphertext.len(),
        });
    }

    let c = BigUint::from_bytes_be(ciphertext);
    if &c >= key.n() {
        return Err(KeyError::OutOfRange);
    }

    let m = c.modpow(key.e(), key.n());
    let block = left_pad(&m.to_bytes_be(), k)?;
    strip_padding(&block).map(<[u8]>::to_vec)
}

/// Left-pad a big-endian integer to exactly `len` bytes.
fn left_pad(bytes: &[u8], len: usize) -> Result<Vec<u8>, KeyError> {
    if bytes.len() > len {
        return Err(KeyError::OutOfRange);
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Remove `00 || BT || PS || 00` from an encoded block.
fn strip_padding(block: &[u8]) -> Result<&[u8], KeyError> {
    if block.len() < MIN_PADDING_LEN + 3 {
        return Err(KeyError::InvalidPadding("block too short"));
    }
    if block[0] != 0x00 {
        return Err(KeyError::InvalidPadding("missing leading zero"));
    }

    let block_type = block[1];
    if block_type != BLOCK_TYPE_PRIVATE && block_type != BLOCK_TYPE_PUBLIC {
        return Err(KeyError::InvalidPadding("unknown block type"));
    }

    let separator = block[2..]
        .iter()
        .position(|&b| b == 0x00)
        .map(|pos| pos + 2)
        .ok_or(KeyError::InvalidPadding("missing separator"))?;

    let padding = &block[2..separator];
    if padding.len() < MIN_PADDING_LEN {
        return Err(KeyError::InvalidPadding("padding too short"));
    }
    if block_type == BLOCK_TYPE_PRIVATE && padding.iter().any(|&b| b != 0xFF) {
        return Err(KeyError::InvalidPadding("bad filler byte"));
    }

    Ok(&block[separator + 1..])
}

// =============================================================================
// TESTS
// =============================================================================
