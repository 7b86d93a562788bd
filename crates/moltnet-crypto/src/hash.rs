//! SHA-256 hashing utilities.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash and return as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_output_is_64_chars() {
        let hash = sha256_hex(b"moltnet");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(sha256(b"same input"), sha256(b"same input"));
    }
}
