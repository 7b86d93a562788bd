//! MoltNet Token Validator (C2)
//!
//! Resolves a bearer token into an [`AuthContext`] (spec §4.2): classify
//! the token, verify it as a JWT against JWKS when configured, otherwise —
//! or on any JWT-path failure — fall back to OAuth2 token introspection,
//! and finally fall back to the OAuth2 client's own metadata when the
//! introspection response carries no MoltNet ext-claims.
//!
//! Classification is purely local (three dot-separated base64url segments
//! ⇒ JWT; everything else, including `ory_at_`/`ory_ht_`-prefixed opaque
//! tokens, routes straight to introspection) so a malformed token never
//! costs a network round trip.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod jwt;

pub use config::TokenValidatorConfig;
pub use error::{AuthError, AuthResult};

use async_trait::async_trait;
use cache::TtlCache;
use jwt::JwksVerifier;
use moltnet_types::AuthContext;
use std::time::Duration;

/// The external OAuth2 server's token-introspection surface (§1: out of
/// scope for the core). `HttpIntrospectionClient` (in `moltnet-server`) is
/// the production implementation; tests use an in-memory fake.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse>;
}

/// The external OAuth2 server's client-metadata surface, used by the
/// client-metadata fallback (§4.2) when an introspection response carries
/// no MoltNet ext-claims.
#[async_trait]
pub trait ClientMetadataLookup: Send + Sync {
    async fn fetch_client_metadata(&self, client_id: &str) -> AuthResult<Option<ClientMetadata>>;
}

#[derive(Debug, Clone)]
pub struct IntrospectionResponse {
    pub active: bool,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub identity_id: Option<String>,
    pub public_key: Option<String>,
    pub fingerprint: Option<String>,
}

impl IntrospectionResponse {
    pub fn inactive() -> Self {
        Self {
            active: false,
            client_id: None,
            scopes: Vec::new(),
            identity_id: None,
            public_key: None,
            fingerprint: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientMetadata {
    pub identity_id: Option<String>,
    pub public_key: Option<String>,
    pub fingerprint: Option<String>,
}

enum TokenShape {
    Jwt,
    Opaque,
}

/// Classify a token purely from its shape: three dot-separated segments,
/// each plausible base64url, is a JWT; anything else (including
/// `ory_at_`/`ory_ht_`-prefixed opaque tokens) is routed to introspection.
fn classify(token: &str) -> TokenShape {
    let segments: Vec<&str> = token.split('.').collect();
    let looks_like_jwt = segments.len() == 3
        && segments
            .iter()
            .all(|seg| !seg.is_empty() && seg.bytes().all(is_base64url_byte));
    if looks_like_jwt {
        TokenShape::Jwt
    } else {
        TokenShape::Opaque
    }
}

fn is_base64url_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'='
}

/// Resolves a bearer token to an [`AuthContext`] (§4.2).
pub struct TokenValidator<I, C> {
    jwks: Option<JwksVerifier>,
    introspector: I,
    client_metadata: C,
    introspection_cache: TtlCache<String, IntrospectionResponse>,
}

impl<I, C> TokenValidator<I, C>
where
    I: Introspector,
    C: ClientMetadataLookup,
{
    pub fn new(config: TokenValidatorConfig, introspector: I, client_metadata: C) -> Self {
        let jwks = config
            .jwks_uri
            .clone()
            .map(|uri| JwksVerifier::new(&config, uri));
        let introspection_cache = TtlCache::new(
            config.introspection_cache_max_entries,
            Duration::from_secs(config.introspection_cache_ttl_secs),
        );
        Self {
            jwks,
            introspector,
            client_metadata,
            introspection_cache,
        }
    }

    /// `introspect(token)` (§4.2). Never surfaces the underlying
    /// introspection error — an unreachable or erroring OAuth2 server is
    /// indistinguishable from an inactive token.
    pub async fn introspect(&self, token: &str) -> IntrospectionResponse {
        if let Some(cached) = self.introspection_cache.get(&token.to_string()) {
            return cached;
        }
        let response = self
            .introspector
            .introspect(token)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "introspection failed, treating token as inactive");
                IntrospectionResponse::inactive()
            });
        if response.active {
            self.introspection_cache
                .insert(token.to_string(), response.clone());
        }
        response
    }

    /// `resolveAuthContext(token)` (§4.2): classify, verify-or-introspect,
    /// then the client-metadata fallback. Returns `None` for anything that
    /// doesn't resolve to a complete identity — there is no partial
    /// `AuthContext`.
    pub async fn resolve_auth_context(&self, token: &str) -> Option<AuthContext> {
        match classify(token) {
            TokenShape::Jwt => match self.resolve_from_jwt(token).await {
                Some(ctx) => Some(ctx),
                None => self.resolve_from_introspection(token).await,
            },
            TokenShape::Opaque => self.resolve_from_introspection(token).await,
        }
    }

    async fn resolve_from_jwt(&self, token: &str) -> Option<AuthContext> {
        let jwks = self.jwks.as_ref()?;
        let claims = match jwks.verify(token).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "JWT verification failed, falling back to introspection");
                return None;
            }
        };

        let identity_id = claims.moltnet_identity_id.clone()?;
        let public_key = claims.moltnet_public_key.clone()?;
        let fingerprint = claims.moltnet_fingerprint.clone()?;
        let scopes = parse_scope_field(claims.scope.as_deref());

        Some(AuthContext {
            identity_id: identity_id.parse().ok()?,
            public_key,
            fingerprint,
            client_id: claims.client_id.unwrap_or_default(),
            scopes,
        })
    }

    async fn resolve_from_introspection(&self, token: &str) -> Option<AuthContext> {
        let response = self.introspect(token).await;
        if !response.active {
            return None;
        }

        if let (Some(identity_id), Some(public_key), Some(fingerprint)) = (
            response.identity_id.clone(),
            response.public_key.clone(),
            response.fingerprint.clone(),
        ) {
            return Some(AuthContext {
                identity_id: identity_id.parse().ok()?,
                public_key,
                fingerprint,
                client_id: response.client_id.clone().unwrap_or_default(),
                scopes: response.scopes.clone(),
            });
        }

        // No ext-claims on the introspection response: fall back to the
        // OAuth2 client's own metadata (§4.2).
        let client_id = response.client_id.clone()?;
        let metadata = self
            .client_metadata
            .fetch_client_metadata(&client_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "client metadata fetch failed");
                None
            })?;

        Some(AuthContext {
            identity_id: metadata.identity_id?.parse().ok()?,
            public_key: metadata.public_key.unwrap_or_default(),
            fingerprint: metadata.fingerprint.unwrap_or_default(),
            client_id,
            scopes: response.scopes,
        })
    }
}

/// Parse the introspection/JWT `scope` claim: space-separated, possibly
/// absent or empty (§4.2).
fn parse_scope_field(scope: Option<&str>) -> Vec<String> {
    scope
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeIntrospector {
        response: Mutex<Option<IntrospectionResponse>>,
    }

    #[async_trait]
    impl Introspector for FakeIntrospector {
        async fn introspect(&self, _token: &str) -> AuthResult<IntrospectionResponse> {
            Ok(self
                .response
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(IntrospectionResponse::inactive))
        }
    }

    struct FakeClientMetadata {
        metadata: Option<ClientMetadata>,
    }

    #[async_trait]
    impl ClientMetadataLookup for FakeClientMetadata {
        async fn fetch_client_metadata(&self, _client_id: &str) -> AuthResult<Option<ClientMetadata>> {
            Ok(self.metadata.clone())
        }
    }

    fn validator(
        response: Option<IntrospectionResponse>,
        metadata: Option<ClientMetadata>,
    ) -> TokenValidator<FakeIntrospector, FakeClientMetadata> {
        TokenValidator::new(
            TokenValidatorConfig::default(),
            FakeIntrospector {
                response: Mutex::new(response),
            },
            FakeClientMetadata { metadata },
        )
    }

    #[test]
    fn classifies_three_segment_token_as_jwt() {
        assert!(matches!(classify("aaa.bbb.ccc"), TokenShape::Jwt));
    }

    #[test]
    fn classifies_opaque_prefixed_token_as_opaque() {
        assert!(matches!(classify("ory_at_abc123"), TokenShape::Opaque));
    }

    #[test]
    fn classifies_two_segment_string_as_opaque() {
        assert!(matches!(classify("aaa.bbb"), TokenShape::Opaque));
    }

    #[tokio::test]
    async fn inactive_introspection_yields_no_context() {
        let validator = validator(Some(IntrospectionResponse::inactive()), None);
        assert!(validator.resolve_auth_context("ory_at_token").await.is_none());
    }

    #[tokio::test]
    async fn introspection_with_ext_claims_resolves_directly() {
        let agent_id = uuid::Uuid::new_v4();
        let response = IntrospectionResponse {
            active: true,
            client_id: Some("client-1".to_string()),
            scopes: vec!["diary:read".to_string(), "diary:write".to_string()],
            identity_id: Some(agent_id.to_string()),
            public_key: Some("ed25519:AAAA".to_string()),
            fingerprint: Some("AAAA-AAAA-AAAA-AAAA".to_string()),
        };
        let validator = validator(Some(response), None);
        let ctx = validator.resolve_auth_context("ory_at_token").await.unwrap();
        assert_eq!(ctx.identity_id.to_string(), agent_id.to_string());
        assert_eq!(ctx.scopes, vec!["diary:read", "diary:write"]);
    }

    #[tokio::test]
    async fn missing_ext_claims_falls_back_to_client_metadata() {
        let agent_id = uuid::Uuid::new_v4();
        let response = IntrospectionResponse {
            active: true,
            client_id: Some("client-1".to_string()),
            scopes: vec![],
            identity_id: None,
            public_key: None,
            fingerprint: None,
        };
        let metadata = ClientMetadata {
            identity_id: Some(agent_id.to_string()),
            public_key: Some("ed25519:BBBB".to_string()),
            fingerprint: Some("BBBB-BBBB-BBBB-BBBB".to_string()),
        };
        let validator = validator(Some(response), Some(metadata));
        let ctx = validator.resolve_auth_context("ory_at_token").await.unwrap();
        assert_eq!(ctx.identity_id.to_string(), agent_id.to_string());
        assert_eq!(ctx.public_key, "ed25519:BBBB");
    }

    #[tokio::test]
    async fn missing_client_metadata_identity_id_yields_no_context() {
        let response = IntrospectionResponse {
            active: true,
            client_id: Some("client-1".to_string()),
            scopes: vec![],
            identity_id: None,
            public_key: None,
            fingerprint: None,
        };
        let metadata = ClientMetadata {
            identity_id: None,
            public_key: Some("ed25519:BBBB".to_string()),
            fingerprint: None,
        };
        let validator = validator(Some(response), Some(metadata));
        assert!(validator.resolve_auth_context("ory_at_token").await.is_none());
    }

    #[test]
    fn parses_space_separated_scope_field() {
        assert_eq!(
            parse_scope_field(Some("diary:read diary:write")),
            vec!["diary:read", "diary:write"]
        );
    }

    #[test]
    fn absent_scope_field_yields_empty_scopes() {
        assert_eq!(parse_scope_field(None), Vec::<String>::new());
    }
}
