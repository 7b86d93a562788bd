//! Voucher-based web-of-trust admission control.

use crate::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single-use admission token issued by one agent for another.
///
/// Invariant: exactly one of `(redeemed_by, redeemed_at)` both-set or
/// both-null holds; once set, never cleared. A voucher is *active* iff
/// `redeemed_at.is_none() && expires_at > now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// ≥ 256-bit random value, hex-encoded. Returned to the issuer exactly
    /// once, at issuance time.
    pub code: String,
    pub issuer_id: AgentId,
    pub redeemed_by: Option<AgentId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// True iff this voucher can still be redeemed as of `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.redeemed_at.is_none() && self.expires_at > now
    }
}

/// A directed edge in the trust graph: `issuer` vouched for `redeemer`.
///
/// Identifiers are fingerprints, never mutable display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEdge {
    pub issuer_fingerprint: String,
    pub redeemer_fingerprint: String,
    pub redeemed_at: DateTime<Utc>,
}

/// Maximum number of simultaneously active (unredeemed, unexpired) vouchers
/// a single issuer may hold.
pub const MAX_ACTIVE_VOUCHERS_PER_ISSUER: i64 = 5;

/// Default voucher lifetime.
pub const VOUCHER_TTL_SECONDS: i64 = 24 * 60 * 60;
