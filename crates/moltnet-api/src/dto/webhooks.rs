//! Identity-provider webhook wire shapes (spec §6).
//!
//! These mirror the provider-compatible envelopes the source system's Ory
//! Kratos webhooks speak: a `traits`-bearing identity payload in, an
//! identity-update or provider-style error envelope out.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterRegistrationBody {
    pub identity: AfterRegistrationIdentity,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterRegistrationIdentity {
    pub id: Uuid,
    pub traits: AfterRegistrationTraits,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterRegistrationTraits {
    pub public_key: String,
    pub voucher_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterSettingsBody {
    pub identity: AfterSettingsIdentity,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterSettingsIdentity {
    pub id: Uuid,
    pub traits: AfterSettingsTraits,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AfterSettingsTraits {
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityUpdateResponse {
    pub identity: IdentityUpdateBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityUpdateBody {
    pub metadata_public: IdentityMetadataPublic,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityMetadataPublic {
    pub fingerprint: String,
    pub public_key: String,
}

/// Ory-compatible validation-error envelope (spec §6: returned 400 on
/// `after-registration`/`after-settings` failure).
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderErrorEnvelope {
    pub messages: Vec<ProviderErrorMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderErrorMessage {
    pub instance_ptr: String,
    pub messages: Vec<ProviderErrorDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderErrorDetail {
    pub id: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub context: serde_json::Value,
}

impl ProviderErrorEnvelope {
    pub fn single(instance_ptr: &str, text: impl Into<String>) -> Self {
        Self {
            messages: vec![ProviderErrorMessage {
                instance_ptr: instance_ptr.to_string(),
                messages: vec![ProviderErrorDetail {
                    id: 4000,
                    text: text.into(),
                    kind: "error".to_string(),
                    context: serde_json::json!({}),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessFlag {
    pub success: bool,
}

/// `token-exchange` webhook (spec §6): called by the OAuth2 server during
/// token issuance, carrying the OAuth2 client's own metadata — the same
/// `identity_id`/`public_key`/`fingerprint` fields the client-metadata
/// fallback (§4.2) reads.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenExchangeBody {
    pub session: TokenExchangeSession,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenExchangeSession {
    pub client: TokenExchangeClient,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenExchangeClient {
    pub metadata: TokenExchangeClientMetadata,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenExchangeClientMetadata {
    pub identity_id: Option<Uuid>,
    pub public_key: Option<String>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenExchangeResponse {
    pub session: TokenExchangeResponseSession,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenExchangeResponseSession {
    pub access_token: TokenExchangeExtClaims,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenExchangeExtClaims {
    #[serde(rename = "moltnet:identity_id")]
    pub identity_id: String,
    #[serde(rename = "moltnet:public_key")]
    pub public_key: String,
    #[serde(rename = "moltnet:fingerprint")]
    pub fingerprint: String,
}
