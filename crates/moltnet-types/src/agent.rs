//! Agent records: the public identity of a principal in the network.

use crate::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An Ed25519 public key in its wire representation: `ed25519:<base64>`.
///
/// Stored and compared as the formatted string rather than raw bytes so
/// that uniqueness constraints and equality checks at the persistence
/// layer operate on the same canonical form a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyString(pub String);

impl PublicKeyString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicKeyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dash-grouped 16-hex-char fingerprint: `XXXX-XXXX-XXXX-XXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A principal in the network, identified by an Ed25519 public key and its
/// derived fingerprint.
///
/// Invariant: `fingerprint == derive_fingerprint(public_key)` at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub identity_id: AgentId,
    pub public_key: PublicKeyString,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
