//! Identity-provider and OAuth2-server webhook handlers (spec §6).
//!
//! All three share the same shared-secret auth: the `x-ory-api-key`
//! header, checked constant-time against the configured secret so a
//! misconfigured or compromised caller can't time its way to the value.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::dto::{
    AfterRegistrationBody, AfterSettingsBody, IdentityMetadataPublic, IdentityUpdateBody,
    IdentityUpdateResponse, ProviderErrorEnvelope, SuccessFlag, TokenExchangeBody,
    TokenExchangeExtClaims, TokenExchangeResponse, TokenExchangeResponseSession,
};
use crate::state::AppState;
use moltnet_crypto::{derive_fingerprint, parse_public_key};

fn webhook_authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers.get("x-ory-api-key").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value.as_bytes().ct_eq(secret.as_bytes()).into()
}

fn provider_error(instance_ptr: &str, text: impl Into<String>) -> (StatusCode, Json<ProviderErrorEnvelope>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ProviderErrorEnvelope::single(instance_ptr, text)),
    )
}

#[utoipa::path(
    post,
    path = "/webhooks/after-registration",
    tag = "Webhooks",
    request_body = AfterRegistrationBody,
    responses(
        (status = 200, description = "Registration admitted; fingerprint derived and agent recorded", body = IdentityUpdateResponse),
        (status = 400, description = "Invalid public key or voucher", body = ProviderErrorEnvelope),
        (status = 401, description = "Missing or invalid webhook secret")
    )
)]
pub async fn after_registration(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AfterRegistrationBody>,
) -> Result<Json<IdentityUpdateResponse>, (StatusCode, Json<ProviderErrorEnvelope>)> {
    if !webhook_authorized(&headers, &state.webhook_secret) {
        return Err((StatusCode::UNAUTHORIZED, Json(ProviderErrorEnvelope::single("", "unauthorized"))));
    }

    let identity_id = body.identity.id.into();
    let registered = state
        .registration
        .register(
            identity_id,
            &body.identity.traits.public_key,
            &body.identity.traits.voucher_code,
        )
        .await
        .map_err(|e| provider_error("/traits/voucher_code", e.to_string()))?;

    Ok(Json(IdentityUpdateResponse {
        identity: IdentityUpdateBody {
            metadata_public: IdentityMetadataPublic {
                fingerprint: registered.agent.fingerprint.to_string(),
                public_key: registered.agent.public_key.to_string(),
            },
        },
    }))
}

#[utoipa::path(
    post,
    path = "/webhooks/after-settings",
    tag = "Webhooks",
    request_body = AfterSettingsBody,
    responses(
        (status = 200, description = "Agent key/fingerprint updated", body = SuccessFlag),
        (status = 400, description = "Invalid public key", body = ProviderErrorEnvelope),
        (status = 401, description = "Missing or invalid webhook secret")
    )
)]
pub async fn after_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AfterSettingsBody>,
) -> Result<Json<SuccessFlag>, (StatusCode, Json<ProviderErrorEnvelope>)> {
    if !webhook_authorized(&headers, &state.webhook_secret) {
        return Err((StatusCode::UNAUTHORIZED, Json(ProviderErrorEnvelope::single("", "unauthorized"))));
    }

    let key = parse_public_key(&body.identity.traits.public_key)
        .map_err(|e| provider_error("/traits/public_key", e.to_string()))?;
    let fingerprint = derive_fingerprint(key.as_bytes());

    state
        .db
        .agent_repo()
        .upsert(body.identity.id, &body.identity.traits.public_key, &fingerprint)
        .await
        .map_err(|e| provider_error("/traits/public_key", e.to_string()))?;

    Ok(Json(SuccessFlag { success: true }))
}

#[utoipa::path(
    post,
    path = "/webhooks/token-exchange",
    tag = "Webhooks",
    request_body = TokenExchangeBody,
    responses(
        (status = 200, description = "MoltNet ext claims to fold into the access token", body = TokenExchangeResponse),
        (status = 401, description = "Missing or invalid webhook secret"),
        (status = 403, description = "Client metadata missing identity_id/public_key/fingerprint")
    )
)]
pub async fn token_exchange(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TokenExchangeBody>,
) -> Result<Json<TokenExchangeResponse>, StatusCode> {
    if !webhook_authorized(&headers, &state.webhook_secret) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let metadata = body.session.client.metadata;
    let (Some(identity_id), Some(public_key), Some(fingerprint)) =
        (metadata.identity_id, metadata.public_key, metadata.fingerprint)
    else {
        return Err(StatusCode::FORBIDDEN);
    };

    Ok(Json(TokenExchangeResponse {
        session: TokenExchangeResponseSession {
            access_token: TokenExchangeExtClaims {
                identity_id: identity_id.to_string(),
                public_key,
                fingerprint,
            },
        },
    }))
}
