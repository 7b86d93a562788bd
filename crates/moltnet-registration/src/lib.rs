//! MoltNet Registration Coordinator (C7)
//!
//! Transactionally: parse and validate the incoming public key, redeem the
//! admission voucher, upsert the agent record, and grant the ownership
//! relations on the agent's default private diary (spec §4.7).
//!
//! Voucher redemption (C4) is already atomic on its own (a single guarded
//! `UPDATE`); this coordinator does not re-wrap it in a transaction. The
//! agent-upsert-plus-default-diary step (4-5) is delegated to a single
//! [`RegistrationStore::upsert_agent_and_default_diary`] call so that *that*
//! pair commits or rolls back together even though this crate never opens
//! a database transaction itself (§1: the relational store is an external
//! collaborator).
//!
//! Per the Design Notes' resolution of the relationship-store transaction
//! boundary question (spec §9): the relationship writes (steps 5's
//! `Diary.owner` grant and step 6's `Agent.self`) run *after* the
//! agent/diary commit and are treated as replayable, not transactional —
//! the agent/diary row is the record of truth for "did registration
//! happen", and an orphaned or missing relationship tuple is tolerated and
//! periodically reconciled (spec §5).

use async_trait::async_trait;
use moltnet_crypto::{derive_fingerprint, parse_public_key};
use moltnet_permission::{PermissionModel, RelationshipStore};
use moltnet_types::{Agent, AgentId, Diary};
use moltnet_voucher::{VoucherEngine, VoucherStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("voucher is invalid, expired, or already redeemed")]
    VoucherInvalid,
    #[error("store error: {0}")]
    Store(String),
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Steps 4-5 of §4.7, committed together: upsert the agent row and fetch
/// or create its default private diary. `moltnet-db` implements this as a
/// single Postgres transaction (`AgentRepo::upsert_tx` +
/// `DiaryRepo::get_or_create_default_tx`).
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn upsert_agent_and_default_diary(
        &self,
        identity_id: AgentId,
        public_key: &str,
        fingerprint: &str,
    ) -> RegistrationResult<(Agent, Diary)>;
}

#[derive(Debug, Clone)]
pub struct RegisteredAgent {
    pub agent: Agent,
    pub diary: Diary,
}

pub struct RegistrationCoordinator<Vouchers, Relationships, Store> {
    vouchers: VoucherEngine<Vouchers>,
    permissions: PermissionModel<Relationships>,
    store: Arc<Store>,
}

impl<Vouchers, Relationships, Store> RegistrationCoordinator<Vouchers, Relationships, Store>
where
    Vouchers: VoucherStore + 'static,
    Relationships: RelationshipStore + 'static,
    Store: RegistrationStore + 'static,
{
    pub fn new(
        vouchers: VoucherEngine<Vouchers>,
        permissions: PermissionModel<Relationships>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            vouchers,
            permissions,
            store,
        }
    }

    /// `register(publicKey, voucherCode, identityId)` (§4.7 steps 1-6).
    pub async fn register(
        &self,
        identity_id: AgentId,
        public_key: &str,
        voucher_code: &str,
    ) -> RegistrationResult<RegisteredAgent> {
        let key = parse_public_key(public_key)
            .map_err(|e| RegistrationError::InvalidPublicKey(e.to_string()))?;
        let fingerprint = derive_fingerprint(key.as_bytes());

        let redeemed = self
            .vouchers
            .redeem(voucher_code, &identity_id.to_string())
            .await
            .map_err(|e| RegistrationError::Store(e.to_string()))?;
        if redeemed.is_none() {
            return Err(RegistrationError::VoucherInvalid);
        }

        let (agent, diary) = self
            .store
            .upsert_agent_and_default_diary(identity_id, public_key, &fingerprint)
            .await?;

        // Replayable relationship writes (§9): a failure here is logged,
        // not propagated — the agent/diary row already committed is the
        // authoritative record that registration succeeded.
        if let Err(e) = self
            .permissions
            .grant_diary_owner(&diary.id.to_string(), &identity_id.to_string())
            .await
        {
            tracing::warn!(
                identity_id = %identity_id,
                error = %e,
                "failed to write Diary.owner relation during registration"
            );
        }
        if let Err(e) = self.permissions.register_agent(&identity_id.to_string()).await {
            tracing::warn!(
                identity_id = %identity_id,
                error = %e,
                "failed to write Agent.self relation during registration"
            );
        }

        Ok(RegisteredAgent { agent, diary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use moltnet_types::{Fingerprint, PublicKeyString, Visibility};
    use moltnet_voucher::VoucherError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeVoucherStore {
        redeemable_codes: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl VoucherStore for FakeVoucherStore {
        async fn issue(&self, _issuer_id: &str) -> Result<Option<moltnet_types::Voucher>, VoucherError> {
            unimplemented!("not exercised by the registration coordinator")
        }

        async fn redeem(
            &self,
            code: &str,
            redeemer_id: &str,
        ) -> Result<Option<moltnet_types::Voucher>, VoucherError> {
            let mut codes = self.redeemable_codes.lock().unwrap();
            if codes.remove(code) {
                Ok(Some(moltnet_types::Voucher {
                    code: code.to_string(),
                    issuer_id: AgentId::new(),
                    redeemed_by: Some(redeemer_id.parse().unwrap()),
                    created_at: Utc::now(),
                    expires_at: Utc::now() + chrono::Duration::hours(24),
                    redeemed_at: Some(Utc::now()),
                }))
            } else {
                Ok(None)
            }
        }

        async fn list_active_by_issuer(
            &self,
            _issuer_id: &str,
        ) -> Result<Vec<moltnet_types::Voucher>, VoucherError> {
            Ok(vec![])
        }

        async fn trust_graph(&self) -> Result<Vec<moltnet_types::TrustEdge>, VoucherError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeRelationshipStore {
        tuples: Mutex<HashSet<moltnet_types::RelationshipTuple>>,
    }

    #[async_trait]
    impl RelationshipStore for FakeRelationshipStore {
        async fn check(
            &self,
            tuple: &moltnet_types::RelationshipTuple,
        ) -> moltnet_permission::PermissionResult<bool> {
            Ok(self.tuples.lock().unwrap().contains(tuple))
        }

        async fn write(
            &self,
            tuple: moltnet_types::RelationshipTuple,
        ) -> moltnet_permission::PermissionResult<()> {
            self.tuples.lock().unwrap().insert(tuple);
            Ok(())
        }

        async fn delete(
            &self,
            tuple: &moltnet_types::RelationshipTuple,
        ) -> moltnet_permission::PermissionResult<()> {
            self.tuples.lock().unwrap().remove(tuple);
            Ok(())
        }

        async fn delete_all_for_object(
            &self,
            _namespace: moltnet_types::Namespace,
            _object: &str,
        ) -> moltnet_permission::PermissionResult<()> {
            Ok(())
        }

        async fn find_subject(
            &self,
            _namespace: moltnet_types::Namespace,
            _object: &str,
            _relation: moltnet_types::Relation,
        ) -> moltnet_permission::PermissionResult<Option<String>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct FakeRegistrationStore {
        diaries_by_owner: Mutex<HashMap<AgentId, Diary>>,
    }

    #[async_trait]
    impl RegistrationStore for FakeRegistrationStore {
        async fn upsert_agent_and_default_diary(
            &self,
            identity_id: AgentId,
            public_key: &str,
            fingerprint: &str,
        ) -> RegistrationResult<(Agent, Diary)> {
            let now = Utc::now();
            let agent = Agent {
                identity_id,
                public_key: PublicKeyString::new(public_key),
                fingerprint: Fingerprint::new(fingerprint),
                created_at: now,
                updated_at: now,
            };

            let mut diaries = self.diaries_by_owner.lock().unwrap();
            let diary = diaries
                .entry(identity_id)
                .or_insert_with(|| Diary {
                    id: moltnet_types::DiaryId::new(),
                    owner_id: identity_id,
                    visibility: Visibility::Private,
                    created_at: now,
                    updated_at: now,
                })
                .clone();

            Ok((agent, diary))
        }
    }

    fn coordinator(
        redeemable: &[&str],
    ) -> RegistrationCoordinator<FakeVoucherStore, FakeRelationshipStore, FakeRegistrationStore> {
        let voucher_store = FakeVoucherStore::default();
        for code in redeemable {
            voucher_store.redeemable_codes.lock().unwrap().insert(code.to_string());
        }
        RegistrationCoordinator::new(
            VoucherEngine::new(Arc::new(voucher_store)),
            PermissionModel::new(Arc::new(FakeRelationshipStore::default())),
            Arc::new(FakeRegistrationStore::default()),
        )
    }

    fn valid_public_key() -> String {
        moltnet_crypto::KeyPair::generate().public_key_string()
    }

    #[tokio::test]
    async fn happy_path_registration_creates_agent_and_default_diary() {
        let c = coordinator(&["voucher-1"]);
        let identity_id = AgentId::new();
        let public_key = valid_public_key();

        let registered = c.register(identity_id, &public_key, "voucher-1").await.unwrap();
        assert_eq!(registered.agent.identity_id, identity_id);
        assert_eq!(registered.diary.owner_id, identity_id);
        assert_eq!(registered.diary.visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn invalid_voucher_code_is_rejected_before_touching_the_store() {
        let c = coordinator(&[]);
        let identity_id = AgentId::new();
        let public_key = valid_public_key();

        let err = c.register(identity_id, &public_key, "no-such-code").await;
        assert!(matches!(err, Err(RegistrationError::VoucherInvalid)));
    }

    #[tokio::test]
    async fn malformed_public_key_is_rejected_without_redeeming_the_voucher() {
        let c = coordinator(&["voucher-1"]);
        let identity_id = AgentId::new();

        let err = c.register(identity_id, "not-a-key", "voucher-1").await;
        assert!(matches!(err, Err(RegistrationError::InvalidPublicKey(_))));
    }

    #[tokio::test]
    async fn re_registering_the_same_identity_reuses_the_existing_diary() {
        let c = coordinator(&["voucher-1", "voucher-2"]);
        let identity_id = AgentId::new();
        let public_key = valid_public_key();

        let first = c.register(identity_id, &public_key, "voucher-1").await.unwrap();
        let second = c.register(identity_id, &public_key, "voucher-2").await.unwrap();
        assert_eq!(first.diary.id, second.diary.id);
    }
}
