//! Canonical signing bytes and Ed25519 sign/verify over them.

use crate::CryptoError;
use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

const DOMAIN_PREFIX: &[u8] = b"moltnet:v1";

/// Build the canonical signing bytes for a `(message, nonce)` pair:
///
/// `"moltnet:v1" ‖ u32be(32) ‖ SHA-256(utf8(message)) ‖ u32be(len(utf8(nonce))) ‖ utf8(nonce)`
///
/// The fixed domain prefix and explicit length-prefixed fields make this
/// immune to whitespace/newline/encoding drift across client implementations.
pub fn canonical_signing_bytes(message: &str, nonce: &str) -> Vec<u8> {
    let message_digest = Sha256::digest(message.as_bytes());
    let nonce_bytes = nonce.as_bytes();

    let mut out = Vec::with_capacity(
        DOMAIN_PREFIX.len() + 4 + message_digest.len() + 4 + nonce_bytes.len(),
    );
    out.extend_from_slice(DOMAIN_PREFIX);
    out.extend_from_slice(&32u32.to_be_bytes());
    out.extend_from_slice(&message_digest);
    out.extend_from_slice(&(nonce_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(nonce_bytes);
    out
}

/// Sign the canonical envelope for `(message, nonce)`.
pub fn sign_canonical(
    signing_key: &ed25519_dalek::SigningKey,
    message: &str,
    nonce: &str,
) -> Ed25519Signature {
    let bytes = canonical_signing_bytes(message, nonce);
    signing_key.sign(&bytes)
}

/// Verify a base64-encoded signature against the canonical envelope for
/// `(message, nonce)` under `public_key`.
///
/// Returns `Ok(true)`/`Ok(false)` for a well-formed but possibly-wrong
/// signature (the spec's "wrong-key submit" case: `status = completed`,
/// `valid = false`, never a 4xx). Only a malformed base64/length signature
/// is an `Err`.
pub fn verify_canonical(
    public_key: &VerifyingKey,
    message: &str,
    nonce: &str,
    signature_b64: &str,
) -> Result<bool, CryptoError> {
    let signature = decode_signature(signature_b64)?;
    let bytes = canonical_signing_bytes(message, nonce);
    Ok(public_key.verify(&bytes, &signature).is_ok())
}

/// Decode a base64 Ed25519 signature, rejecting anything that isn't
/// structurally a signature (wrong length, invalid base64).
pub fn decode_signature(signature_b64: &str) -> Result<Ed25519Signature, CryptoError> {
    use base64::Engine;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let raw: [u8; 64] = raw.try_into().map_err(|_| CryptoError::InvalidSignature)?;
    Ok(Ed25519Signature::from_bytes(&raw))
}

/// Legacy raw-message sign/verify, retained only for pre-envelope callers.
/// New signing flows must use [`sign_canonical`]/[`verify_canonical`].
pub mod legacy {
    use super::*;

    pub fn sign_raw(signing_key: &ed25519_dalek::SigningKey, message: &[u8]) -> Ed25519Signature {
        signing_key.sign(message)
    }

    pub fn verify_raw(
        public_key: &VerifyingKey,
        message: &[u8],
        signature_b64: &str,
    ) -> Result<bool, CryptoError> {
        let signature = decode_signature(signature_b64)?;
        Ok(public_key.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;
    use base64::Engine;

    fn encode_sig(sig: &Ed25519Signature) -> String {
        base64::engine::general_purpose::STANDARD.encode(sig.to_bytes())
    }

    #[test]
    fn sign_then_verify_agrees() {
        let keypair = KeyPair::generate();
        let sig = sign_canonical(keypair.signing_key(), "hello world", "deadbeef");
        let ok = verify_canonical(
            keypair.verifying_key(),
            "hello world",
            "deadbeef",
            &encode_sig(&sig),
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn unicode_message_verifies() {
        let keypair = KeyPair::generate();
        let message = "sign this — with a 🔑";
        let sig = sign_canonical(keypair.signing_key(), message, "0011223344");
        let ok = verify_canonical(
            keypair.verifying_key(),
            message,
            "0011223344",
            &encode_sig(&sig),
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn wrong_key_yields_false_not_error() {
        let signer = KeyPair::generate();
        let other = KeyPair::generate();
        let sig = sign_canonical(signer.signing_key(), "message", "nonce");
        let ok = verify_canonical(other.verifying_key(), "message", "nonce", &encode_sig(&sig))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn different_nonce_fails_verification() {
        let keypair = KeyPair::generate();
        let sig = sign_canonical(keypair.signing_key(), "message", "nonce-a");
        let ok = verify_canonical(
            keypair.verifying_key(),
            "message",
            "nonce-b",
            &encode_sig(&sig),
        )
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn malformed_signature_is_an_error() {
        let keypair = KeyPair::generate();
        let err = verify_canonical(keypair.verifying_key(), "message", "nonce", "not-base64!!");
        assert!(matches!(err, Err(CryptoError::InvalidSignature)));
    }
}
