//! MoltNet Voucher Engine (C4)
//!
//! Web-of-trust admission control: single-use, 24h-lived vouchers, capped
//! at five simultaneously active per issuer (spec §3, §4.4). The atomicity
//! spec §4.4/§5 requires — the issuer-cap check-then-insert, and the
//! one-winner redemption — is the responsibility of the concrete
//! [`VoucherStore`] (`moltnet-db::VoucherRepo` in production, a single
//! `SERIALIZABLE` transaction and a single guarded `UPDATE` respectively).
//! This crate adds no locking of its own: per §5, voucher redemption is
//! "serialized per `code` via a single atomic UPDATE ... no external lock
//! required."

use async_trait::async_trait;
use moltnet_types::{TrustEdge, Voucher};

/// The external persistence seam C4 depends on.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// `None` iff the issuer already holds the maximum number of active
    /// vouchers.
    async fn issue(&self, issuer_id: &str) -> Result<Option<Voucher>, VoucherError>;

    /// `None` uniformly for an unknown code, an already-redeemed voucher,
    /// or an expired one.
    async fn redeem(&self, code: &str, redeemer_id: &str) -> Result<Option<Voucher>, VoucherError>;

    async fn list_active_by_issuer(&self, issuer_id: &str) -> Result<Vec<Voucher>, VoucherError>;

    async fn trust_graph(&self) -> Result<Vec<TrustEdge>, VoucherError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VoucherError {
    #[error("voucher store error: {0}")]
    Store(String),
}

/// Thin typed façade over a [`VoucherStore`]. Holds no state itself; exists
/// so callers (the registration coordinator, the API layer) depend on one
/// narrow domain type instead of the raw store trait.
#[derive(Clone)]
pub struct VoucherEngine<S: VoucherStore> {
    store: std::sync::Arc<S>,
}

impl<S: VoucherStore> VoucherEngine<S> {
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }

    pub async fn issue(&self, issuer_id: &str) -> Result<Option<Voucher>, VoucherError> {
        self.store.issue(issuer_id).await
    }

    /// Callers must not leak which of {unknown code, already redeemed,
    /// expired} produced a `None` (spec §4.4, §7 `VoucherInvalid`).
    pub async fn redeem(
        &self,
        code: &str,
        redeemer_id: &str,
    ) -> Result<Option<Voucher>, VoucherError> {
        self.store.redeem(code, redeemer_id).await
    }

    pub async fn list_active_by_issuer(
        &self,
        issuer_id: &str,
    ) -> Result<Vec<Voucher>, VoucherError> {
        self.store.list_active_by_issuer(issuer_id).await
    }

    pub async fn trust_graph(&self) -> Result<Vec<TrustEdge>, VoucherError> {
        self.store.trust_graph().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use moltnet_types::{AgentId, MAX_ACTIVE_VOUCHERS_PER_ISSUER};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A single-threaded in-memory fake, good enough to exercise the
    /// engine's pass-through behavior and the cap/race invariants at the
    /// unit-test level; the real atomicity guarantees live in
    /// `moltnet-db::VoucherRepo`'s SQL.
    #[derive(Default)]
    struct FakeStore {
        vouchers: Mutex<HashMap<String, Voucher>>,
    }

    #[async_trait]
    impl VoucherStore for FakeStore {
        async fn issue(&self, issuer_id: &str) -> Result<Option<Voucher>, VoucherError> {
            let mut vouchers = self.vouchers.lock().unwrap();
            let now = Utc::now();
            let active = vouchers
                .values()
                .filter(|v| v.issuer_id.to_string() == issuer_id && v.is_active(now))
                .count() as i64;
            if active >= MAX_ACTIVE_VOUCHERS_PER_ISSUER {
                return Ok(None);
            }
            let code = uuid::Uuid::new_v4().to_string();
            let voucher = Voucher {
                code: code.clone(),
                issuer_id: issuer_id.parse::<AgentId>().unwrap(),
                redeemed_by: None,
                created_at: now,
                expires_at: now + Duration::hours(24),
                redeemed_at: None,
            };
            vouchers.insert(code, voucher.clone());
            Ok(Some(voucher))
        }

        async fn redeem(
            &self,
            code: &str,
            redeemer_id: &str,
        ) -> Result<Option<Voucher>, VoucherError> {
            let mut vouchers = self.vouchers.lock().unwrap();
            let now = Utc::now();
            match vouchers.get_mut(code) {
                Some(v) if v.is_active(now) => {
                    v.redeemed_by = Some(redeemer_id.parse().unwrap());
                    v.redeemed_at = Some(now);
                    Ok(Some(v.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn list_active_by_issuer(
            &self,
            issuer_id: &str,
        ) -> Result<Vec<Voucher>, VoucherError> {
            let vouchers = self.vouchers.lock().unwrap();
            let now = Utc::now();
            Ok(vouchers
                .values()
                .filter(|v| v.issuer_id.to_string() == issuer_id && v.is_active(now))
                .cloned()
                .collect())
        }

        async fn trust_graph(&self) -> Result<Vec<TrustEdge>, VoucherError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn issuer_cap_is_enforced() {
        let engine = VoucherEngine::new(std::sync::Arc::new(FakeStore::default()));
        let issuer = AgentId::new().to_string();
        for _ in 0..5 {
            assert!(engine.issue(&issuer).await.unwrap().is_some());
        }
        assert!(engine.issue(&issuer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redeeming_same_code_twice_only_one_winner() {
        let engine = VoucherEngine::new(std::sync::Arc::new(FakeStore::default()));
        let issuer = AgentId::new().to_string();
        let voucher = engine.issue(&issuer).await.unwrap().unwrap();

        let r1 = engine.redeem(&voucher.code, &AgentId::new().to_string()).await.unwrap();
        let r2 = engine.redeem(&voucher.code, &AgentId::new().to_string()).await.unwrap();

        assert!(r1.is_some() ^ r2.is_some());
    }

    #[tokio::test]
    async fn unknown_code_yields_none() {
        let engine = VoucherEngine::new(std::sync::Arc::new(FakeStore::default()));
        assert!(engine.redeem("no-such-code", "redeemer").await.unwrap().is_none());
    }
}
