//! Recovery-challenge handlers (C6). No auth: these are how a caller who
//! has lost their bearer token proves key possession in the first place.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::dto::{RecoveryChallengeBody, RecoveryChallengeResponse, RecoveryVerifyBody, RecoveryVerifyResponse};
use crate::error::ApiError;
use crate::state::AppState;
use moltnet_recovery::VerifyChallengeRequest;

#[utoipa::path(
    post,
    path = "/v1/recovery/challenge",
    tag = "Recovery",
    request_body = RecoveryChallengeBody,
    responses(
        (status = 200, description = "A fresh challenge bound to the supplied public key", body = RecoveryChallengeResponse)
    )
)]
pub async fn challenge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecoveryChallengeBody>,
) -> Result<Json<RecoveryChallengeResponse>, ApiError> {
    let resp = state.recovery.request_challenge(&body.public_key).await?;
    Ok(Json(RecoveryChallengeResponse {
        challenge: resp.challenge,
        hmac: resp.hmac,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/recovery/verify",
    tag = "Recovery",
    request_body = RecoveryVerifyBody,
    responses(
        (status = 200, description = "A freshly minted recovery code", body = RecoveryVerifyResponse),
        (status = 400, description = "Challenge invalid, expired, or already used")
    )
)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecoveryVerifyBody>,
) -> Result<Json<RecoveryVerifyResponse>, ApiError> {
    let resp = state
        .recovery
        .verify_challenge(VerifyChallengeRequest {
            challenge: body.challenge,
            hmac: body.hmac,
            signature: body.signature,
            public_key: body.public_key,
        })
        .await?;
    Ok(Json(RecoveryVerifyResponse {
        recovery_code: resp.recovery_code,
        recovery_flow_url: resp.recovery_flow_url,
    }))
}
