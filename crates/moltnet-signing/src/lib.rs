//! MoltNet Signing-Request Workflow (C5)
//!
//! The durable, asynchronous prepare → sign-locally → submit → verify
//! protocol (spec §4.5). The workflow is the single writer of a signing
//! request's `status`/`signature`/`valid`/`completed_at`; `submit` never
//! writes directly — it only delivers into the workflow's inbound slot,
//! matching §5's per-`id` linear-ordering rule.
//!
//! This crate models the durable workflow as a `tokio::spawn`ed task per
//! signing request, racing a delivery on a one-shot "signature" slot
//! against the absolute `expires_at` deadline — a goroutine-like task with
//! a deadline-bound wait, per the Design Notes' menu of acceptable
//! implementations. Restart rehydration is [`SigningWorkflowEngine::rehydrate`].

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use moltnet_crypto::{canonical_signing_bytes, parse_public_key, verify_canonical};
use moltnet_types::{
    AgentId, SigningRequest, SigningRequestId, SigningStatus, MAX_ED25519_SIGNATURE_LENGTH,
    MAX_SIGNING_MESSAGE_CHARS, SIGNING_REQUEST_TTL_SECONDS, SUBMIT_POLL_INTERVAL_MS,
    SUBMIT_POLL_TIMEOUT_MS,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing request not found")]
    NotFound,
    #[error("signing request expired")]
    Expired,
    #[error("signing request already completed")]
    AlreadyCompleted,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type SigningResult<T> = Result<T, SigningError>;

/// The relational store's signing-request surface (§1: out of scope for
/// the core). `moltnet-db::SigningRequestRepo` is the default
/// implementation.
#[async_trait]
pub trait SigningRequestStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        id: SigningRequestId,
        agent_id: AgentId,
        message: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> SigningResult<SigningRequest>;

    async fn set_workflow_id(&self, id: SigningRequestId, workflow_id: &str) -> SigningResult<()>;

    async fn find_by_id(&self, id: SigningRequestId) -> SigningResult<Option<SigningRequest>>;

    async fn list_for_agent(
        &self,
        agent_id: AgentId,
        status_filter: Option<&[SigningStatus]>,
    ) -> SigningResult<Vec<SigningRequest>>;

    /// Every still-pending row, for post-restart rehydration.
    async fn list_pending(&self) -> SigningResult<Vec<SigningRequest>>;

    /// Atomic terminal transition to `completed`; a no-op (not an error)
    /// if the row is no longer `pending`.
    async fn complete(
        &self,
        id: SigningRequestId,
        signature: &str,
        valid: bool,
    ) -> SigningResult<Option<SigningRequest>>;

    /// Atomic terminal transition to `expired`; a no-op if the row is no
    /// longer `pending`.
    async fn expire(&self, id: SigningRequestId) -> SigningResult<Option<SigningRequest>>;
}

/// Resolves an agent's currently registered public key, to verify a
/// submitted signature against (§4.5 step 2). Backed by
/// `moltnet-db::AgentRepo` in production.
#[async_trait]
pub trait AgentKeyLookup: Send + Sync {
    async fn public_key_for(&self, agent_id: AgentId) -> SigningResult<Option<String>>;
}

/// `create`'s response: the row plus the exact bytes the client must sign
/// locally (§4.5: "the client signs the exact bytes the server will
/// verify").
#[derive(Debug, Clone)]
pub struct SigningCreateResponse {
    pub request: SigningRequest,
    pub signing_input: String,
}

/// The durable signing-request workflow engine.
pub struct SigningWorkflowEngine<Store, Keys> {
    store: Arc<Store>,
    keys: Arc<Keys>,
    timeout_seconds: i64,
    /// In-memory delivery slots, keyed by `workflow_id`. Entries are
    /// removed the moment they're consumed (by delivery or by expiry),
    /// which is what makes a duplicate delivery attempt a silent no-op
    /// rather than a double verification.
    inbox: Arc<DashMap<String, oneshot::Sender<String>>>,
}

impl<Store, Keys> SigningWorkflowEngine<Store, Keys>
where
    Store: SigningRequestStore + 'static,
    Keys: AgentKeyLookup + 'static,
{
    pub fn new(store: Arc<Store>, keys: Arc<Keys>) -> Self {
        Self {
            store,
            keys,
            timeout_seconds: SIGNING_REQUEST_TTL_SECONDS,
            inbox: Arc::new(DashMap::new()),
        }
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: i64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Rehydrate in-flight workflows after a restart (§4.5 step 5):
    /// already-terminal rows are never touched; still-pending rows with a
    /// recorded `workflow_id` get a fresh in-process task racing the same
    /// absolute deadline.
    pub async fn rehydrate(&self) -> SigningResult<usize> {
        let pending = self.store.list_pending().await?;
        let mut resumed = 0;
        for row in pending {
            let Some(workflow_id) = row.workflow_id.clone() else {
                continue;
            };
            self.spawn_workflow(
                row.id,
                workflow_id,
                row.agent_id,
                row.message.clone(),
                row.nonce.clone(),
                row.expires_at,
            );
            resumed += 1;
        }
        tracing::info!(resumed, "rehydrated pending signing workflows");
        Ok(resumed)
    }

    /// `create(agentId, message)` (§4.5).
    pub async fn create(&self, agent_id: AgentId, message: String) -> SigningResult<SigningCreateResponse> {
        let char_len = message.chars().count();
        if char_len == 0 || char_len > MAX_SIGNING_MESSAGE_CHARS {
            return Err(SigningError::InvalidMessage(format!(
                "message must be 1-{MAX_SIGNING_MESSAGE_CHARS} chars, got {char_len}"
            )));
        }

        let nonce = random_nonce_hex();
        let id = SigningRequestId::new();
        let expires_at = Utc::now() + chrono::Duration::seconds(self.timeout_seconds);

        let mut row = self
            .store
            .create(id, agent_id, &message, &nonce, expires_at)
            .await?;

        let workflow_id = format!("signing-workflow:{id}");
        self.store.set_workflow_id(id, &workflow_id).await?;
        row.workflow_id = Some(workflow_id.clone());

        self.spawn_workflow(id, workflow_id, agent_id, message, nonce.clone(), expires_at);

        let signing_input = base64::engine::general_purpose::STANDARD
            .encode(canonical_signing_bytes(&row.message, &nonce));

        Ok(SigningCreateResponse {
            request: row,
            signing_input,
        })
    }

    /// `list(agentId, filter)` (§4.5).
    pub async fn list(
        &self,
        agent_id: AgentId,
        status_filter: Option<&[SigningStatus]>,
    ) -> SigningResult<Vec<SigningRequest>> {
        self.store.list_for_agent(agent_id, status_filter).await
    }

    /// `get(id, agentId)` (§4.5): existence and ownership are
    /// indistinguishable from outside — both yield `NotFound`.
    pub async fn get(&self, id: SigningRequestId, agent_id: AgentId) -> SigningResult<SigningRequest> {
        let row = self.store.find_by_id(id).await?.ok_or(SigningError::NotFound)?;
        if row.agent_id != agent_id {
            return Err(SigningError::NotFound);
        }
        Ok(row)
    }

    /// `submit(id, agentId, signature)` (§4.5): the five fail-fast
    /// preconditions, then delivery, then the 5s/100ms poll.
    pub async fn submit(
        &self,
        id: SigningRequestId,
        agent_id: AgentId,
        signature: String,
    ) -> SigningResult<SigningRequest> {
        let row = self.store.find_by_id(id).await?.ok_or(SigningError::NotFound)?;
        if row.agent_id != agent_id {
            return Err(SigningError::NotFound);
        }

        if row.status == SigningStatus::Expired || row.expires_at <= Utc::now() {
            return Err(SigningError::Expired);
        }
        if row.status == SigningStatus::Completed {
            return Err(SigningError::AlreadyCompleted);
        }
        let Some(workflow_id) = row.workflow_id.clone() else {
            return Err(SigningError::NotFound);
        };
        if signature.len() > MAX_ED25519_SIGNATURE_LENGTH {
            return Err(SigningError::InvalidSignature(format!(
                "signature exceeds {MAX_ED25519_SIGNATURE_LENGTH} bytes"
            )));
        }

        // At-most-once delivery: a second submit finds no sender left and
        // is a silent no-op, never re-driving verification.
        if let Some((_, sender)) = self.inbox.remove(&workflow_id) {
            let _ = sender.send(signature);
        }

        self.poll_for_terminal(id).await
    }

    async fn poll_for_terminal(&self, id: SigningRequestId) -> SigningResult<SigningRequest> {
        let deadline = tokio::time::Instant::now()
            + tokio::time::Duration::from_millis(SUBMIT_POLL_TIMEOUT_MS);
        loop {
            let row = self.store.find_by_id(id).await?.ok_or(SigningError::NotFound)?;
            if row.status != SigningStatus::Pending || tokio::time::Instant::now() >= deadline {
                return Ok(row);
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(SUBMIT_POLL_INTERVAL_MS)).await;
        }
    }

    fn spawn_workflow(
        &self,
        id: SigningRequestId,
        workflow_id: String,
        agent_id: AgentId,
        message: String,
        nonce: String,
        expires_at: DateTime<Utc>,
    ) {
        let (tx, rx) = oneshot::channel::<String>();
        self.inbox.insert(workflow_id.clone(), tx);

        let store = self.store.clone();
        let keys = self.keys.clone();
        let inbox = self.inbox.clone();

        tokio::spawn(async move {
            let remaining = (expires_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(remaining) => {
                    inbox.remove(&workflow_id);
                    if let Err(e) = store.expire(id).await {
                        tracing::warn!(signing_request_id = %id, error = %e, "failed to expire signing request");
                    }
                }
                received = rx => {
                    inbox.remove(&workflow_id);
                    if let Ok(signature) = received {
                        let valid = verify_submission(&*keys, agent_id, &message, &nonce, &signature).await;
                        if let Err(e) = store.complete(id, &signature, valid).await {
                            tracing::warn!(signing_request_id = %id, error = %e, "failed to complete signing request");
                        }
                    }
                }
            }
        });
    }
}

/// §4.5 step 2: reconstruct canonical signing bytes from the stored
/// `(message, nonce)` and verify against the owning agent's registered
/// key. A malformed registered key or signature is treated as `valid =
/// false`, never a server error — the wrong-key/bad-signature case is
/// exactly what `valid = false` exists to report (spec §8 scenario 4).
async fn verify_submission<Keys: AgentKeyLookup>(
    keys: &Keys,
    agent_id: AgentId,
    message: &str,
    nonce: &str,
    signature: &str,
) -> bool {
    let Ok(Some(public_key_str)) = keys.public_key_for(agent_id).await else {
        return false;
    };
    let Ok(public_key) = parse_public_key(&public_key_str) else {
        return false;
    };
    verify_canonical(&public_key, message, nonce, signature).unwrap_or(false)
}

fn random_nonce_hex() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltnet_crypto::KeyPair;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<HashMap<SigningRequestId, SigningRequest>>,
    }

    #[async_trait]
    impl SigningRequestStore for FakeStore {
        async fn create(
            &self,
            id: SigningRequestId,
            agent_id: AgentId,
            message: &str,
            nonce: &str,
            expires_at: DateTime<Utc>,
        ) -> SigningResult<SigningRequest> {
            let row = SigningRequest {
                id,
                agent_id,
                message: message.to_string(),
                nonce: nonce.to_string(),
                workflow_id: None,
                status: SigningStatus::Pending,
                signature: None,
                valid: None,
                created_at: Utc::now(),
                expires_at,
                completed_at: None,
            };
            self.rows.lock().unwrap().insert(id, row.clone());
            Ok(row)
        }

        async fn set_workflow_id(&self, id: SigningRequestId, workflow_id: &str) -> SigningResult<()> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
                row.workflow_id = Some(workflow_id.to_string());
            }
            Ok(())
        }

        async fn find_by_id(&self, id: SigningRequestId) -> SigningResult<Option<SigningRequest>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn list_for_agent(
            &self,
            agent_id: AgentId,
            _status_filter: Option<&[SigningStatus]>,
        ) -> SigningResult<Vec<SigningRequest>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.agent_id == agent_id)
                .cloned()
                .collect())
        }

        async fn list_pending(&self) -> SigningResult<Vec<SigningRequest>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.status == SigningStatus::Pending)
                .cloned()
                .collect())
        }

        async fn complete(
            &self,
            id: SigningRequestId,
            signature: &str,
            valid: bool,
        ) -> SigningResult<Option<SigningRequest>> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.get_mut(&id) {
                if row.status == SigningStatus::Pending {
                    row.status = SigningStatus::Completed;
                    row.signature = Some(signature.to_string());
                    row.valid = Some(valid);
                    row.completed_at = Some(Utc::now());
                    return Ok(Some(row.clone()));
                }
            }
            Ok(None)
        }

        async fn expire(&self, id: SigningRequestId) -> SigningResult<Option<SigningRequest>> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.get_mut(&id) {
                if row.status == SigningStatus::Pending {
                    row.status = SigningStatus::Expired;
                    return Ok(Some(row.clone()));
                }
            }
            Ok(None)
        }
    }

    struct FakeKeys {
        key: String,
    }

    #[async_trait]
    impl AgentKeyLookup for FakeKeys {
        async fn public_key_for(&self, _agent_id: AgentId) -> SigningResult<Option<String>> {
            Ok(Some(self.key.clone()))
        }
    }

    fn engine(public_key: String) -> SigningWorkflowEngine<FakeStore, FakeKeys> {
        SigningWorkflowEngine::new(
            Arc::new(FakeStore::default()),
            Arc::new(FakeKeys { key: public_key }),
        )
    }

    #[tokio::test]
    async fn happy_path_signing_completes_valid() {
        let keypair = KeyPair::generate();
        let engine = engine(keypair.public_key_string());
        let agent_id = AgentId::new();

        let created = engine
            .create(agent_id, "Sign this e2e message".to_string())
            .await
            .unwrap();
        assert_eq!(created.request.status, SigningStatus::Pending);

        let input = base64::engine::general_purpose::STANDARD
            .decode(&created.signing_input)
            .unwrap();
        let signature = keypair.signing_key().sign(&input);
        use ed25519_dalek::Signer;
        let _ = &signature; // silence unused import warning path in some toolchains
        let sig_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let result = engine.submit(created.request.id, agent_id, sig_b64.clone()).await.unwrap();
        assert_eq!(result.status, SigningStatus::Completed);
        assert_eq!(result.valid, Some(true));
        assert_eq!(result.signature, Some(sig_b64));
    }

    #[tokio::test]
    async fn wrong_key_submission_completes_invalid_not_error() {
        let signer = KeyPair::generate();
        let other = KeyPair::generate();
        let engine = engine(other.public_key_string());
        let agent_id = AgentId::new();

        let created = engine
            .create(agent_id, "message".to_string())
            .await
            .unwrap();

        use ed25519_dalek::Signer;
        let input = base64::engine::general_purpose::STANDARD
            .decode(&created.signing_input)
            .unwrap();
        let signature = signer.signing_key().sign(&input);
        let sig_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let result = engine.submit(created.request.id, agent_id, sig_b64).await.unwrap();
        assert_eq!(result.status, SigningStatus::Completed);
        assert_eq!(result.valid, Some(false));
    }

    #[tokio::test]
    async fn resubmitting_after_completed_fails() {
        let keypair = KeyPair::generate();
        let engine = engine(keypair.public_key_string());
        let agent_id = AgentId::new();

        let created = engine.create(agent_id, "message".to_string()).await.unwrap();
        use ed25519_dalek::Signer;
        let input = base64::engine::general_purpose::STANDARD
            .decode(&created.signing_input)
            .unwrap();
        let signature = keypair.signing_key().sign(&input);
        let sig_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        engine.submit(created.request.id, agent_id, sig_b64.clone()).await.unwrap();
        let err = engine.submit(created.request.id, agent_id, sig_b64).await;
        assert!(matches!(err, Err(SigningError::AlreadyCompleted)));
    }

    #[tokio::test]
    async fn get_hides_existence_for_wrong_agent() {
        let keypair = KeyPair::generate();
        let engine = engine(keypair.public_key_string());
        let owner = AgentId::new();
        let stranger = AgentId::new();

        let created = engine.create(owner, "message".to_string()).await.unwrap();
        let err = engine.get(created.request.id, stranger).await;
        assert!(matches!(err, Err(SigningError::NotFound)));
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let engine = engine("ed25519:AAAA".to_string());
        let err = engine.create(AgentId::new(), String::new()).await;
        assert!(matches!(err, Err(SigningError::InvalidMessage(_))));
    }
}
