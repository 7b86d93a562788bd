//! Application state shared across handlers.
//!
//! Wires the domain engines (C3-C8) to their concrete `moltnet-db`
//! repositories and outbound HTTP adapters, the way the reference
//! workspace's `AppState` wires `Database` and `AuthService` together.
//! Handlers depend only on this struct, never on a repository directly,
//! except for the agent directory lookup the verify-signature endpoint
//! needs (reached through `db` itself).

use std::sync::Arc;
use std::time::Duration;

use moltnet_auth::http::{HttpClientMetadataClient, HttpIntrospectionClient};
use moltnet_auth::{TokenValidator, TokenValidatorConfig};
use moltnet_db::{AgentRepo, Database, PgRelationshipStore, PostgresHybridSearch, RegistrationRepo, SigningRequestRepo, VoucherRepo};
use moltnet_feed::PublicFeedGate;
use moltnet_permission::PermissionModel;
use moltnet_recovery::{HttpIdentityAdmin, InMemoryNonceStore, RecoveryChallengeEngine};
use moltnet_registration::RegistrationCoordinator;
use moltnet_signing::SigningWorkflowEngine;
use moltnet_voucher::VoucherEngine;

use crate::embedding::EmbeddingClient;
use crate::rate_limit::RateLimiter;

pub type SigningEngine = SigningWorkflowEngine<SigningRequestRepo, AgentRepo>;
pub type PermissionModelT = PermissionModel<PgRelationshipStore>;
pub type VoucherEngineT = VoucherEngine<VoucherRepo>;
pub type RegistrationCoordinatorT = RegistrationCoordinator<VoucherRepo, PgRelationshipStore, RegistrationRepo>;
pub type RecoveryEngineT = RecoveryChallengeEngine<InMemoryNonceStore, AgentRepo, HttpIdentityAdmin>;
pub type FeedGateT = PublicFeedGate<PostgresHybridSearch, PostgresHybridSearch, EmbeddingClient>;
pub type TokenValidatorT = TokenValidator<HttpIntrospectionClient, HttpClientMetadataClient>;

/// Everything the binary must supply beyond the database connection
/// itself: secrets and endpoints for the external collaborators C2, C6,
/// and C8 reach (§1 Non-goals), plus the webhook shared secret (§6).
pub struct ApiConfig {
    pub token_validator: TokenValidatorConfig,

    pub recovery_secret: Vec<u8>,
    pub recovery_flow_base_url: String,
    pub identity_admin_base_url: String,
    pub identity_admin_token: String,

    pub embedding_url: String,

    /// Compared, constant-time, against the inbound `x-ory-api-key`
    /// header on the three webhook endpoints (§6).
    pub webhook_secret: String,

    /// Requests allowed per IP per window on the unauthenticated surface
    /// (recovery, public feed) before `RateLimited` (§7).
    pub rate_limit_per_window: u32,
    pub rate_limit_window_secs: u64,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub signing: Arc<SigningEngine>,
    pub permissions: Arc<PermissionModelT>,
    pub vouchers: Arc<VoucherEngineT>,
    pub registration: Arc<RegistrationCoordinatorT>,
    pub recovery: Arc<RecoveryEngineT>,
    pub feed: Arc<FeedGateT>,
    pub tokens: Arc<TokenValidatorT>,
    pub webhook_secret: Arc<str>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: ApiConfig) -> Self {
        let agent_repo = Arc::new(db.agent_repo());
        let voucher_repo = Arc::new(db.voucher_repo());
        let signing_repo = Arc::new(db.signing_request_repo());
        let relationship_store = Arc::new(db.relationship_store());
        let registration_repo = Arc::new(db.registration_repo());

        let signing = Arc::new(SigningWorkflowEngine::new(signing_repo, agent_repo.clone()));
        let permissions = Arc::new(PermissionModel::new(relationship_store.clone()));
        let vouchers = Arc::new(VoucherEngine::new(voucher_repo.clone()));
        let registration = Arc::new(RegistrationCoordinator::new(
            VoucherEngine::new(voucher_repo),
            PermissionModel::new(relationship_store),
            registration_repo,
        ));

        let identity_admin = Arc::new(HttpIdentityAdmin::new(
            config.identity_admin_base_url,
            config.identity_admin_token,
        ));
        let recovery = Arc::new(RecoveryChallengeEngine::new(
            config.recovery_secret,
            config.recovery_flow_base_url,
            Arc::new(InMemoryNonceStore::new()),
            agent_repo,
            identity_admin,
        ));

        let http_timeout = Duration::from_secs(config.token_validator.http_timeout_secs);
        let feed = Arc::new(PublicFeedGate::new(
            db.hybrid_search(),
            db.hybrid_search(),
            EmbeddingClient::new(config.embedding_url, http_timeout),
        ));

        let introspector = HttpIntrospectionClient::new(
            config.token_validator.introspection_url.clone(),
            config.token_validator.introspection_client_id.clone(),
            config.token_validator.introspection_client_secret.clone(),
            http_timeout,
        );
        let client_metadata = HttpClientMetadataClient::new(
            config.token_validator.client_metadata_url_template.clone(),
            config.token_validator.client_metadata_admin_token.clone(),
            http_timeout,
        );
        let tokens = Arc::new(TokenValidator::new(
            config.token_validator,
            introspector,
            client_metadata,
        ));

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_window,
            Duration::from_secs(config.rate_limit_window_secs),
        ));

        Self {
            db,
            signing,
            permissions,
            vouchers,
            registration,
            recovery,
            feed,
            tokens,
            webhook_secret: Arc::from(config.webhook_secret.as_str()),
            rate_limiter,
        }
    }
}
