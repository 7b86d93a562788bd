//! Recovery-challenge construction and HMAC binding.
//!
//! The challenge engine itself (nonce store, identity-admin call) lives in
//! `moltnet-recovery`; this module owns only the cryptographic envelope,
//! matching C1's listed responsibility in the component design.

use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Minimum length, in bytes, of a server recovery secret.
pub const MIN_RECOVERY_SECRET_LEN: usize = 16;

/// A parsed recovery challenge string: `moltnet:recovery:<publicKey>:<nonceHex64>:<issuedAtMs>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChallenge {
    pub public_key: String,
    pub nonce_hex: String,
    pub issued_at_ms: i64,
}

/// Build the canonical challenge string for `public_key` with a caller-
/// supplied random nonce (hex, 32 bytes) and timestamp.
pub fn build_challenge_string(public_key: &str, nonce_hex: &str, issued_at_ms: i64) -> String {
    format!("moltnet:recovery:{public_key}:{nonce_hex}:{issued_at_ms}")
}

/// Parse a challenge string back into its components.
pub fn parse_challenge(challenge: &str) -> Result<ParsedChallenge, CryptoError> {
    let rest = challenge
        .strip_prefix("moltnet:recovery:")
        .ok_or_else(|| CryptoError::MalformedChallenge("missing challenge prefix".into()))?;

    // public_key itself is `ed25519:<base64>`, which contains no colons, so
    // splitting from the right by the two trailing fields is unambiguous.
    let mut parts = rest.rsplitn(3, ':');
    let issued_at_raw = parts
        .next()
        .ok_or_else(|| CryptoError::MalformedChallenge("missing issuedAt".into()))?;
    let nonce_hex = parts
        .next()
        .ok_or_else(|| CryptoError::MalformedChallenge("missing nonce".into()))?;
    let public_key = parts
        .next()
        .ok_or_else(|| CryptoError::MalformedChallenge("missing public key".into()))?;

    let issued_at_ms: i64 = issued_at_raw
        .parse()
        .map_err(|_| CryptoError::MalformedChallenge("issuedAt is not a timestamp".into()))?;

    Ok(ParsedChallenge {
        public_key: public_key.to_string(),
        nonce_hex: nonce_hex.to_string(),
        issued_at_ms,
    })
}

/// HMAC-SHA256(recovery_secret, challenge), hex-encoded.
pub fn hmac_challenge(recovery_secret: &[u8], challenge: &str) -> Result<String, CryptoError> {
    if recovery_secret.len() < MIN_RECOVERY_SECRET_LEN {
        return Err(CryptoError::InvalidHmacKey(format!(
            "recovery secret must be at least {MIN_RECOVERY_SECRET_LEN} bytes"
        )));
    }
    let mut mac = HmacSha256::new_from_slice(recovery_secret)
        .map_err(|e| CryptoError::InvalidHmacKey(e.to_string()))?;
    mac.update(challenge.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time verification of a challenge's HMAC.
pub fn verify_challenge_hmac(
    recovery_secret: &[u8],
    challenge: &str,
    expected_hmac_hex: &str,
) -> Result<bool, CryptoError> {
    let computed = hmac_challenge(recovery_secret, challenge)?;
    Ok(computed.as_bytes().ct_eq(expected_hmac_hex.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef";

    #[test]
    fn challenge_roundtrips_through_parse() {
        let s = build_challenge_string("ed25519:AAAA", "deadbeef", 1_700_000_000_000);
        let parsed = parse_challenge(&s).unwrap();
        assert_eq!(parsed.public_key, "ed25519:AAAA");
        assert_eq!(parsed.nonce_hex, "deadbeef");
        assert_eq!(parsed.issued_at_ms, 1_700_000_000_000);
    }

    #[test]
    fn hmac_is_deterministic_and_verifies() {
        let challenge = build_challenge_string("ed25519:AAAA", "deadbeef", 1);
        let hmac = hmac_challenge(SECRET, &challenge).unwrap();
        assert!(verify_challenge_hmac(SECRET, &challenge, &hmac).unwrap());
    }

    #[test]
    fn tampered_challenge_fails_verification() {
        let challenge = build_challenge_string("ed25519:AAAA", "deadbeef", 1);
        let hmac = hmac_challenge(SECRET, &challenge).unwrap();
        let tampered = build_challenge_string("ed25519:BBBB", "deadbeef", 1);
        assert!(!verify_challenge_hmac(SECRET, &tampered, &hmac).unwrap());
    }

    #[test]
    fn rejects_short_secret() {
        let challenge = build_challenge_string("ed25519:AAAA", "deadbeef", 1);
        let err = hmac_challenge(b"short", &challenge);
        assert!(matches!(err, Err(CryptoError::InvalidHmacKey(_))));
    }
}
