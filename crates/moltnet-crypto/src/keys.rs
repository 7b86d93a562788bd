//! Public key parsing, formatting, and fingerprint derivation.

use crate::{CryptoError, CryptoResult};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const PUBLIC_KEY_PREFIX: &str = "ed25519:";

/// An Ed25519 key pair, for tests and client-side tooling.
///
/// Nothing in `moltnet-server` constructs one of these from scratch — the
/// server only ever handles `VerifyingKey`s parsed out of wire material.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// The wire form of this keypair's public half: `ed25519:<base64>`.
    pub fn public_key_string(&self) -> String {
        format_public_key(self.verifying_key.as_bytes())
    }
}

/// Format raw 32-byte Ed25519 key material as `ed25519:<base64>`.
pub fn format_public_key(raw: &[u8; 32]) -> String {
    use base64::Engine;
    format!(
        "{PUBLIC_KEY_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

/// Parse `ed25519:<base64>` into a `VerifyingKey`.
///
/// Fails with `InvalidPublicKey` on a missing/wrong prefix, malformed
/// base64, or a decoded length other than 32 bytes.
pub fn parse_public_key(input: &str) -> CryptoResult<VerifyingKey> {
    let encoded = input
        .strip_prefix(PUBLIC_KEY_PREFIX)
        .ok_or_else(|| CryptoError::InvalidPublicKey("missing ed25519: prefix".into()))?;

    use base64::Engine;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let raw: [u8; 32] = raw
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey("key must be 32 bytes".into()))?;

    VerifyingKey::from_bytes(&raw).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Derive a fingerprint from raw public key bytes: the first 16 hex chars
/// of `SHA-256(rawKey)`, uppercased and dash-grouped every 4 chars.
///
/// Deterministic and stable under UTF-8 byte-identity of the input.
pub fn derive_fingerprint(raw_public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(raw_public_key);
    let hex = hex::encode(digest);
    let prefix = &hex[0..16].to_uppercase();

    prefix
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).expect("ascii hex"))
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive a fingerprint directly from a key's wire form (`ed25519:<base64>`).
pub fn fingerprint_for_public_key_string(input: &str) -> CryptoResult<String> {
    let key = parse_public_key(input)?;
    Ok(derive_fingerprint(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_of_all_zero_key_matches_spec_example() {
        let raw = [0u8; 32];
        let fingerprint = derive_fingerprint(&raw);
        assert_eq!(fingerprint, "6668-7AAD-F862-BD77");
    }

    #[test]
    fn public_key_roundtrips_through_format_and_parse() {
        let keypair = KeyPair::generate();
        let formatted = keypair.public_key_string();
        let parsed = parse_public_key(&formatted).unwrap();
        assert_eq!(parsed, *keypair.verifying_key());
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = parse_public_key("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        assert!(matches!(err, Err(CryptoError::InvalidPublicKey(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        use base64::Engine;
        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        let err = parse_public_key(&format!("ed25519:{short}"));
        assert!(matches!(err, Err(CryptoError::InvalidPublicKey(_))));
    }

    #[test]
    fn fingerprint_derivation_is_deterministic() {
        let raw = [7u8; 32];
        assert_eq!(derive_fingerprint(&raw), derive_fingerprint(&raw));
    }
}
