//! Credential Decoding
//!
//! Decodes QR-scanned credential payloads into typed [`Credential`]s.

pub mod decoder;
pub mod key;

pub use decoder::{
    Credential, CredentialDecoder, DecodeError, DecoderConfig, EncryptedCredentialPayload,
};
pub use key::{load_public_key, KeyError};
