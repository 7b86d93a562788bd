//! MoltNet Crypto - the Ed25519 identity envelope.
//!
//! This crate provides:
//! - Public key parsing (`ed25519:<base64>`) and fingerprint derivation
//! - The canonical signing-bytes envelope and sign/verify over it
//! - Recovery-challenge construction and constant-time HMAC verification
//! - SHA-256 hashing utilities
//!
//! # Security invariant
//!
//! Agent private keys never enter this crate. Every operation here either
//! works purely on public material (parsing, verifying, fingerprinting) or
//! is a test-only convenience (`KeyPair::generate` for exercising the
//! signing flow in integration tests).

pub mod hash;
pub mod keys;
pub mod recovery;
pub mod signature;

pub use hash::*;
pub use keys::*;
pub use recovery::*;
pub use signature::*;

use thiserror::Error;

/// Cryptographic errors.
///
/// `InvalidSignature` and `WrongKey` are intentionally not distinguished by
/// any caller-visible field: the edge layer collapses both to the same
/// problem-details code (see spec §7, anti-enumeration).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid HMAC key: {0}")]
    InvalidHmacKey(String),

    #[error("malformed recovery challenge: {0}")]
    MalformedChallenge(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
