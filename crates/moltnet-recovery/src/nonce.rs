//! Single-use nonce store for recovery challenges (spec §4.6, §5).
//!
//! The nonce is the one piece of per-challenge state the server must
//! remember: a challenge string is otherwise fully self-describing and
//! stateless (it embeds its own `publicKey`/`issuedAtMs`). Consuming a
//! nonce is the single-winner atomic operation §5 requires.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::RecoveryResult;

#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Record a freshly-issued nonce with the TTL it should survive for.
    async fn reserve(&self, nonce_hex: &str, ttl: Duration);

    /// Atomically mark `nonce_hex` consumed. Returns `true` the first time
    /// (the nonce was live and is now spent), `false` for a replay or an
    /// unknown/expired nonce.
    async fn consume(&self, nonce_hex: &str) -> RecoveryResult<bool>;
}

/// Process-wide in-memory nonce store. Matches §5's "recovery secret, JWKS
/// cache, token-introspection cache are process-wide" shared-state policy:
/// the recovery nonce set is short-lived (≤ 5 min per entry) and does not
/// need to survive a restart, so it lives beside the other process-wide
/// caches rather than in the relational store.
#[derive(Default)]
pub struct InMemoryNonceStore {
    entries: DashMap<String, Instant>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries past their deadline. Called opportunistically on every
    /// `reserve`/`consume` so the map doesn't grow unbounded under load;
    /// there is no separate background sweeper.
    fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, deadline| *deadline > now);
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn reserve(&self, nonce_hex: &str, ttl: Duration) {
        self.sweep();
        self.entries.insert(nonce_hex.to_string(), Instant::now() + ttl);
    }

    async fn consume(&self, nonce_hex: &str) -> RecoveryResult<bool> {
        self.sweep();
        match self.entries.remove(nonce_hex) {
            Some((_, deadline)) if deadline > Instant::now() => Ok(true),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_consume_succeeds_second_is_a_replay() {
        let store = InMemoryNonceStore::new();
        store.reserve("deadbeef", Duration::from_secs(60)).await;
        assert!(store.consume("deadbeef").await.unwrap());
        assert!(!store.consume("deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_nonce_is_not_consumable() {
        let store = InMemoryNonceStore::new();
        assert!(!store.consume("never-reserved").await.unwrap());
    }

    #[tokio::test]
    async fn expired_nonce_cannot_be_consumed() {
        let store = InMemoryNonceStore::new();
        store.reserve("deadbeef", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!store.consume("deadbeef").await.unwrap());
    }
}
