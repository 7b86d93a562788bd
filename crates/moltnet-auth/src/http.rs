//! Outbound HTTP clients for the two OAuth2-server surfaces `TokenValidator`
//! reaches beyond JWKS: token introspection and client-metadata lookup
//! (spec §4.2). No OAuth2 authorization server ships with this workspace
//! (an explicit Non-goal) — these are only the outbound clients, following
//! `moltnet-recovery::HttpIdentityAdmin`'s pattern for the same kind of
//! external-collaborator surface.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::AuthError;
use crate::{AuthResult, ClientMetadata, ClientMetadataLookup, IntrospectionResponse, Introspector};

#[derive(Debug, Deserialize)]
struct RawIntrospectionResponse {
    active: bool,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(rename = "moltnet:identity_id", default)]
    moltnet_identity_id: Option<String>,
    #[serde(rename = "moltnet:public_key", default)]
    moltnet_public_key: Option<String>,
    #[serde(rename = "moltnet:fingerprint", default)]
    moltnet_fingerprint: Option<String>,
}

/// Production [`Introspector`]: RFC 7662 token introspection against the
/// configured OAuth2 server, authenticated as a confidential client.
pub struct HttpIntrospectionClient {
    client: reqwest::Client,
    introspection_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpIntrospectionClient {
    pub fn new(
        introspection_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("building the introspection http client");
        Self {
            client,
            introspection_url: introspection_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl Introspector for HttpIntrospectionClient {
    async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        let resp = self
            .client
            .post(&self.introspection_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::IntrospectionRequest(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::IntrospectionRequest(format!(
                "introspection endpoint returned {}",
                resp.status()
            )));
        }

        let raw: RawIntrospectionResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::IntrospectionRequest(e.to_string()))?;

        if !raw.active {
            return Ok(IntrospectionResponse::inactive());
        }

        Ok(IntrospectionResponse {
            active: true,
            client_id: raw.client_id,
            scopes: raw
                .scope
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            identity_id: raw.moltnet_identity_id,
            public_key: raw.moltnet_public_key,
            fingerprint: raw.moltnet_fingerprint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawClientMetadata {
    #[serde(default)]
    metadata: Option<RawClientMetadataFields>,
}

#[derive(Debug, Deserialize, Default)]
struct RawClientMetadataFields {
    #[serde(default)]
    identity_id: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
    #[serde(default)]
    fingerprint: Option<String>,
}

/// Production [`ClientMetadataLookup`]: fetches an OAuth2 client's
/// metadata from the server's admin API, used by the client-metadata
/// fallback (spec §4.2) when an introspection response carries no
/// MoltNet ext-claims.
pub struct HttpClientMetadataClient {
    client: reqwest::Client,
    url_template: String,
    admin_token: String,
}

impl HttpClientMetadataClient {
    /// `url_template` contains a single `{client_id}` placeholder.
    pub fn new(
        url_template: impl Into<String>,
        admin_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("building the client-metadata http client");
        Self {
            client,
            url_template: url_template.into(),
            admin_token: admin_token.into(),
        }
    }

    fn url_for(&self, client_id: &str) -> String {
        self.url_template.replace("{client_id}", client_id)
    }
}

#[async_trait]
impl ClientMetadataLookup for HttpClientMetadataClient {
    async fn fetch_client_metadata(&self, client_id: &str) -> AuthResult<Option<ClientMetadata>> {
        let resp = self
            .client
            .get(self.url_for(client_id))
            .bearer_auth(&self.admin_token)
            .send()
            .await
            .map_err(|e| AuthError::ClientMetadataRequest(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AuthError::ClientMetadataRequest(format!(
                "client metadata endpoint returned {}",
                resp.status()
            )));
        }

        let raw: RawClientMetadata = resp
            .json()
            .await
            .map_err(|e| AuthError::ClientMetadataRequest(e.to_string()))?;
        let fields = raw.metadata.unwrap_or_default();

        Ok(Some(ClientMetadata {
            identity_id: fields.identity_id,
            public_key: fields.public_key,
            fingerprint: fields.fingerprint,
        }))
    }
}
