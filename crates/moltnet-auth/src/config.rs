//! Token validator configuration.
//!
//! Loaded the way the reference's per-concern config structs are: a
//! `Default` for local development, overridable by environment variables
//! and a config file in `moltnet-server`'s own config layer.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::TokenValidator`] (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenValidatorConfig {
    /// JWKS endpoint. JWT verification is skipped entirely (every token
    /// routes straight to introspection) when this is `None`.
    pub jwks_uri: Option<String>,
    /// `iss` values a verified JWT is accepted under.
    pub allowed_issuers: Vec<String>,
    /// `aud` values a verified JWT is accepted under.
    pub allowed_audiences: Vec<String>,
    /// The external OAuth2 server's token introspection endpoint.
    pub introspection_url: String,
    /// Basic-auth client credentials this service authenticates to the
    /// introspection endpoint with.
    pub introspection_client_id: String,
    pub introspection_client_secret: String,
    /// Template for fetching an OAuth2 client's metadata, with `{client_id}`
    /// substituted in. Used by the client-metadata fallback (spec §4.2).
    pub client_metadata_url_template: String,
    /// Bearer token this service authenticates to the client-metadata
    /// endpoint with.
    pub client_metadata_admin_token: String,
    /// Per-call timeout for JWKS fetch, introspection, and client-metadata
    /// calls (spec §5: "per-call timeouts").
    pub http_timeout_secs: u64,
    /// Bounded JWKS key cache (spec §5: "bounded size and TTL").
    pub jwks_cache_max_keys: usize,
    pub jwks_cache_ttl_secs: u64,
    /// Bounded introspection-result cache.
    pub introspection_cache_max_entries: usize,
    pub introspection_cache_ttl_secs: u64,
}

impl Default for TokenValidatorConfig {
    fn default() -> Self {
        Self {
            jwks_uri: None,
            allowed_issuers: Vec::new(),
            allowed_audiences: Vec::new(),
            introspection_url: "http://localhost:4445/oauth2/introspect".to_string(),
            introspection_client_id: String::new(),
            introspection_client_secret: String::new(),
            client_metadata_url_template: "http://localhost:4445/admin/clients/{client_id}"
                .to_string(),
            client_metadata_admin_token: String::new(),
            http_timeout_secs: 5,
            jwks_cache_max_keys: 32,
            jwks_cache_ttl_secs: 15 * 60,
            introspection_cache_max_entries: 4096,
            introspection_cache_ttl_secs: 30,
        }
    }
}

impl TokenValidatorConfig {
    pub fn client_metadata_url(&self, client_id: &str) -> String {
        self.client_metadata_url_template
            .replace("{client_id}", client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_metadata_url_substitutes_client_id() {
        let config = TokenValidatorConfig::default();
        assert_eq!(
            config.client_metadata_url("abc-123"),
            "http://localhost:4445/admin/clients/abc-123"
        );
    }
}
