//! MoltNet Recovery Challenge Engine (C6)
//!
//! HMAC-bound, anti-enumeration account recovery (spec §4.6). A challenge
//! is a self-describing string embedding the caller's claimed public key,
//! a server-minted nonce, and an issue timestamp; the server never stores
//! the challenge itself, only the nonce (single-use, short-TTL).
//!
//! Anti-enumeration is load-bearing here in two places:
//! - `request_challenge` returns the identical response shape whether or
//!   not `public_key` belongs to a registered agent (spec §8 scenario 7).
//! - `verify_challenge` performs the agent lookup *and* the signature
//!   verification unconditionally, collapsing "unknown key" and "signature
//!   mismatch" into the same `InvalidSignature` error so neither the
//!   response nor its timing reveals which one occurred.

pub mod nonce;

use async_trait::async_trait;
use chrono::Utc;
use moltnet_crypto::{
    build_challenge_string, hmac_challenge, legacy::verify_raw, parse_challenge, parse_public_key,
    verify_challenge_hmac,
};
use moltnet_types::AgentId;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use nonce::{InMemoryNonceStore, NonceStore};

/// Challenge freshness window (spec §4.6: "reject if now - issuedAtMs > 5 min").
pub const CHALLENGE_TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("malformed challenge")]
    MalformedChallenge,
    #[error("challenge HMAC does not verify")]
    HmacMismatch,
    #[error("challenge expired")]
    Expired,
    #[error("challenge nonce already used")]
    NonceReplayed,
    /// Collapsed with [`RecoveryError::SignatureMismatch`] at the wire edge
    /// (spec §7 anti-enumeration): an unknown public key must be
    /// indistinguishable from a known key with a bad signature.
    #[error("unknown agent")]
    UnknownAgent,
    #[error("signature does not verify")]
    SignatureMismatch,
    #[error("identity admin error: {0}")]
    Upstream(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Resolves a claimed public key to a registered agent's identity, for the
/// lookup step in `verify_challenge`. `moltnet-db::AgentRepo` backs this in
/// production.
#[async_trait]
pub trait AgentLookup: Send + Sync {
    async fn find_by_public_key(&self, public_key: &str) -> RecoveryResult<Option<AgentId>>;
}

/// The external identity provider's recovery-code minting surface (§1: out
/// of scope for the core; implementing an OAuth2/Ory server is a
/// Non-goal). `moltnet-recovery::HttpIdentityAdmin` — wired in
/// `moltnet-server` — is the production implementation.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    async fn mint_recovery_code(&self, identity_id: AgentId) -> RecoveryResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub hmac: String,
}

#[derive(Debug, Clone)]
pub struct VerifyChallengeRequest {
    pub challenge: String,
    pub hmac: String,
    pub signature: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyChallengeResponse {
    pub recovery_code: String,
    pub recovery_flow_url: String,
}

pub struct RecoveryChallengeEngine<Nonces, Agents, Admin> {
    recovery_secret: Vec<u8>,
    recovery_flow_base_url: String,
    nonces: Arc<Nonces>,
    agents: Arc<Agents>,
    admin: Arc<Admin>,
}

impl<Nonces, Agents, Admin> RecoveryChallengeEngine<Nonces, Agents, Admin>
where
    Nonces: NonceStore + 'static,
    Agents: AgentLookup + 'static,
    Admin: IdentityAdmin + 'static,
{
    pub fn new(
        recovery_secret: Vec<u8>,
        recovery_flow_base_url: impl Into<String>,
        nonces: Arc<Nonces>,
        agents: Arc<Agents>,
        admin: Arc<Admin>,
    ) -> Self {
        Self {
            recovery_secret,
            recovery_flow_base_url: recovery_flow_base_url.into(),
            nonces,
            agents,
            admin,
        }
    }

    /// `requestChallenge(publicKey)` (§4.6). Identical shape and
    /// (modulo the nonce-store write) identical amount of work regardless
    /// of whether `public_key` is known.
    pub async fn request_challenge(&self, public_key: &str) -> RecoveryResult<ChallengeResponse> {
        let nonce_hex = random_nonce_hex();
        let issued_at_ms = Utc::now().timestamp_millis();
        let challenge = build_challenge_string(public_key, &nonce_hex, issued_at_ms);
        let hmac = hmac_challenge(&self.recovery_secret, &challenge)
            .map_err(|_| RecoveryError::Store("recovery secret misconfigured".into()))?;

        self.nonces
            .reserve(&nonce_hex, Duration::from_millis(CHALLENGE_TTL_MS as u64))
            .await;

        Ok(ChallengeResponse { challenge, hmac })
    }

    /// `verifyChallenge(...)` (§4.6). Failures are returned as distinct
    /// variants here; only the edge layer collapses them into the wire's
    /// anti-enumeration classes (spec §7, §9: "collapse classes only at the
    /// wire edge, never internally").
    pub async fn verify_challenge(
        &self,
        req: VerifyChallengeRequest,
    ) -> RecoveryResult<VerifyChallengeResponse> {
        let parsed = parse_challenge(&req.challenge).map_err(|_| RecoveryError::MalformedChallenge)?;

        let hmac_ok = verify_challenge_hmac(&self.recovery_secret, &req.challenge, &req.hmac)
            .map_err(|_| RecoveryError::MalformedChallenge)?;
        if !hmac_ok {
            return Err(RecoveryError::HmacMismatch);
        }

        let age_ms = Utc::now().timestamp_millis() - parsed.issued_at_ms;
        if !(0..=CHALLENGE_TTL_MS).contains(&age_ms) {
            return Err(RecoveryError::Expired);
        }

        let nonce_fresh = self.nonces.consume(&parsed.nonce_hex).await?;
        if !nonce_fresh {
            return Err(RecoveryError::NonceReplayed);
        }

        // Anti-enumeration: the lookup and the signature check both run
        // unconditionally, in the same order, for a known or unknown key —
        // only their *combined* outcome picks the branch below.
        let agent = self.agents.find_by_public_key(&req.public_key).await?;
        let signature_ok = verify_recovery_signature(&req.public_key, &req.challenge, &req.signature);

        let identity_id = match (agent, signature_ok) {
            (Some(identity_id), true) => identity_id,
            (None, _) => return Err(RecoveryError::UnknownAgent),
            (Some(_), false) => return Err(RecoveryError::SignatureMismatch),
        };

        let recovery_code = self
            .admin
            .mint_recovery_code(identity_id)
            .await
            .map_err(|e| RecoveryError::Upstream(e.to_string()))?;

        Ok(VerifyChallengeResponse {
            recovery_flow_url: format!("{}/{}", self.recovery_flow_base_url, identity_id),
            recovery_code,
        })
    }
}

/// §4.6: verify `signature` over the literal challenge string under the
/// claimed `public_key`. A malformed key or signature is just "not
/// verified", never a distinct error — it folds into the same
/// `SignatureMismatch` branch as a well-formed-but-wrong signature.
fn verify_recovery_signature(public_key: &str, challenge: &str, signature: &str) -> bool {
    let Ok(key) = parse_public_key(public_key) else {
        return false;
    };
    verify_raw(&key, challenge.as_bytes(), signature).unwrap_or(false)
}

fn random_nonce_hex() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Default timeout for a single call to the identity admin. The mint call
/// sits on the critical path of `verify_challenge`, which itself must stay
/// fast enough not to leak timing information between the enumeration
/// branches (spec §7) — a hung upstream call must not hang that response.
const IDENTITY_ADMIN_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, serde::Deserialize)]
struct MintRecoveryCodeResponse {
    recovery_code: String,
}

/// Production [`IdentityAdmin`]: mints a recovery code via the external
/// identity provider's admin API. No OAuth2/Ory server ships with this
/// workspace (an explicit Non-goal); this is only the outbound client.
pub struct HttpIdentityAdmin {
    client: reqwest::Client,
    base_url: String,
    admin_token: String,
}

impl HttpIdentityAdmin {
    pub fn new(base_url: impl Into<String>, admin_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(IDENTITY_ADMIN_TIMEOUT_MS))
            .build()
            .expect("building the identity admin http client");

        Self {
            client,
            base_url: base_url.into(),
            admin_token: admin_token.into(),
        }
    }
}

#[async_trait]
impl IdentityAdmin for HttpIdentityAdmin {
    async fn mint_recovery_code(&self, identity_id: AgentId) -> RecoveryResult<String> {
        let url = format!("{}/identities/{}/recovery-code", self.base_url, identity_id);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.admin_token)
            .send()
            .await
            .map_err(|e| RecoveryError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RecoveryError::Upstream(format!(
                "identity admin returned {}",
                resp.status()
            )));
        }

        let body: MintRecoveryCodeResponse = resp
            .json()
            .await
            .map_err(|e| RecoveryError::Upstream(e.to_string()))?;

        Ok(body.recovery_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltnet_crypto::{legacy::sign_raw, KeyPair};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAgents {
        by_key: Mutex<HashMap<String, AgentId>>,
    }

    #[async_trait]
    impl AgentLookup for FakeAgents {
        async fn find_by_public_key(&self, public_key: &str) -> RecoveryResult<Option<AgentId>> {
            Ok(self.by_key.lock().unwrap().get(public_key).copied())
        }
    }

    #[derive(Default)]
    struct FakeAdmin {
        minted: Mutex<Vec<AgentId>>,
    }

    #[async_trait]
    impl IdentityAdmin for FakeAdmin {
        async fn mint_recovery_code(&self, identity_id: AgentId) -> RecoveryResult<String> {
            self.minted.lock().unwrap().push(identity_id);
            Ok(format!("recovery-code-for-{identity_id}"))
        }
    }

    struct FailingAdmin;

    #[async_trait]
    impl IdentityAdmin for FailingAdmin {
        async fn mint_recovery_code(&self, _identity_id: AgentId) -> RecoveryResult<String> {
            Err(RecoveryError::Upstream("identity provider unreachable".into()))
        }
    }

    fn engine<Admin: IdentityAdmin + 'static>(
        agents: FakeAgents,
        admin: Admin,
    ) -> RecoveryChallengeEngine<InMemoryNonceStore, FakeAgents, Admin> {
        RecoveryChallengeEngine::new(
            b"0123456789abcdef".to_vec(),
            "https://moltnet.example/recovery",
            Arc::new(InMemoryNonceStore::new()),
            Arc::new(agents),
            Arc::new(admin),
        )
    }

    #[tokio::test]
    async fn request_challenge_has_well_formed_shape_for_unknown_key() {
        let e = engine(FakeAgents::default(), FakeAdmin::default());
        let resp = e.request_challenge("ed25519:totally-unknown").await.unwrap();
        assert!(resp.challenge.starts_with("moltnet:recovery:"));
        assert_eq!(resp.hmac.len(), 64); // hex-encoded SHA-256
    }

    #[tokio::test]
    async fn happy_path_recovery_mints_a_code() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key_string();
        let identity_id = AgentId::new();

        let agents = FakeAgents::default();
        agents.by_key.lock().unwrap().insert(public_key.clone(), identity_id);
        let e = engine(agents, FakeAdmin::default());

        let challenge_resp = e.request_challenge(&public_key).await.unwrap();
        let signature = sign_raw(keypair.signing_key(), challenge_resp.challenge.as_bytes());
        use base64::Engine as _;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let result = e
            .verify_challenge(VerifyChallengeRequest {
                challenge: challenge_resp.challenge,
                hmac: challenge_resp.hmac,
                signature: signature_b64,
                public_key,
            })
            .await
            .unwrap();

        assert_eq!(result.recovery_code, format!("recovery-code-for-{identity_id}"));
    }

    #[tokio::test]
    async fn replaying_the_same_challenge_is_rejected() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key_string();
        let identity_id = AgentId::new();

        let agents = FakeAgents::default();
        agents.by_key.lock().unwrap().insert(public_key.clone(), identity_id);
        let e = engine(agents, FakeAdmin::default());

        let challenge_resp = e.request_challenge(&public_key).await.unwrap();
        let signature = sign_raw(keypair.signing_key(), challenge_resp.challenge.as_bytes());
        use base64::Engine as _;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let req = VerifyChallengeRequest {
            challenge: challenge_resp.challenge,
            hmac: challenge_resp.hmac,
            signature: signature_b64,
            public_key,
        };

        e.verify_challenge(req.clone()).await.unwrap();
        let err = e.verify_challenge(req).await;
        assert!(matches!(err, Err(RecoveryError::NonceReplayed)));
    }

    #[tokio::test]
    async fn unknown_agent_and_bad_signature_yield_the_same_error_variant() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key_string();
        let e = engine(FakeAgents::default(), FakeAdmin::default());

        let challenge_resp = e.request_challenge(&public_key).await.unwrap();
        let signature = sign_raw(keypair.signing_key(), challenge_resp.challenge.as_bytes());
        use base64::Engine as _;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let err = e
            .verify_challenge(VerifyChallengeRequest {
                challenge: challenge_resp.challenge,
                hmac: challenge_resp.hmac,
                signature: signature_b64,
                public_key,
            })
            .await;
        assert!(matches!(err, Err(RecoveryError::UnknownAgent)));
    }

    #[tokio::test]
    async fn tampered_hmac_is_rejected() {
        let e = engine(FakeAgents::default(), FakeAdmin::default());
        let challenge_resp = e.request_challenge("ed25519:AAAA").await.unwrap();

        let err = e
            .verify_challenge(VerifyChallengeRequest {
                challenge: challenge_resp.challenge,
                hmac: "0".repeat(64),
                signature: "irrelevant".into(),
                public_key: "ed25519:AAAA".into(),
            })
            .await;
        assert!(matches!(err, Err(RecoveryError::HmacMismatch)));
    }

    #[tokio::test]
    async fn identity_admin_failure_surfaces_as_upstream_error() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key_string();
        let identity_id = AgentId::new();

        let agents = FakeAgents::default();
        agents.by_key.lock().unwrap().insert(public_key.clone(), identity_id);
        let e = engine(agents, FailingAdmin);

        let challenge_resp = e.request_challenge(&public_key).await.unwrap();
        let signature = sign_raw(keypair.signing_key(), challenge_resp.challenge.as_bytes());
        use base64::Engine as _;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        let err = e
            .verify_challenge(VerifyChallengeRequest {
                challenge: challenge_resp.challenge,
                hmac: challenge_resp.hmac,
                signature: signature_b64,
                public_key,
            })
            .await;
        assert!(matches!(err, Err(RecoveryError::Upstream(_))));
    }
}
