//! Synchronous signature-verification handlers: "verify signature
//! (agent)" and "verify signature (public)". No auth — these exist so a
//! third party can check an authorship claim without a bearer token.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::dto::{
    SignerInfo, VerifyAgentSignatureBody, VerifyAgentSignatureResponse, VerifyPublicSignatureBody,
    VerifyPublicSignatureResponse,
};
use crate::error::ApiError;
use crate::state::AppState;
use moltnet_crypto::{legacy::verify_raw, parse_public_key};

/// `POST /v1/agents/{fingerprint}/verify` (spec §6 "Verify signature
/// (agent)"): look the fingerprint up in the agent directory, then check
/// the signature against that agent's registered key. An unknown
/// fingerprint is a 404, not a `valid: false` — the caller already knows
/// the fingerprint exists if they're asking about it.
#[utoipa::path(
    post,
    path = "/v1/agents/{fingerprint}/verify",
    tag = "Verify",
    params(("fingerprint" = String, Path, description = "Agent fingerprint")),
    request_body = VerifyAgentSignatureBody,
    responses(
        (status = 200, description = "Verification result against the agent's registered key", body = VerifyAgentSignatureResponse),
        (status = 404, description = "No agent with that fingerprint")
    )
)]
pub async fn verify_agent_signature(
    State(state): State<Arc<AppState>>,
    Path(fingerprint): Path<String>,
    Json(body): Json<VerifyAgentSignatureBody>,
) -> Result<Json<VerifyAgentSignatureResponse>, ApiError> {
    let agent = state
        .db
        .agent_repo()
        .find_by_fingerprint(&fingerprint)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NotFound)?;

    let key = parse_public_key(&agent.public_key).map_err(|e| ApiError::InvalidPublicKey(e.to_string()))?;
    let valid = verify_raw(&key, body.message.as_bytes(), &body.signature).unwrap_or(false);

    Ok(Json(VerifyAgentSignatureResponse {
        valid,
        signer: Some(SignerInfo {
            fingerprint: agent.fingerprint,
            public_key: agent.public_key,
        }),
    }))
}

/// `POST /v1/verify` (spec §6 "Verify signature (public)"): the caller
/// supplies the public key itself, so no directory lookup or fingerprint
/// binding is involved.
#[utoipa::path(
    post,
    path = "/v1/verify",
    tag = "Verify",
    request_body = VerifyPublicSignatureBody,
    responses(
        (status = 200, description = "Verification result against the supplied key", body = VerifyPublicSignatureResponse)
    )
)]
pub async fn verify_public_signature(
    Json(body): Json<VerifyPublicSignatureBody>,
) -> Result<Json<VerifyPublicSignatureResponse>, ApiError> {
    let key = parse_public_key(&body.public_key).map_err(|e| ApiError::InvalidPublicKey(e.to_string()))?;
    let valid = verify_raw(&key, body.message.as_bytes(), &body.signature).unwrap_or(false);
    Ok(Json(VerifyPublicSignatureResponse { valid }))
}
