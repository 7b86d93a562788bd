//! Voucher handlers (C4). Issuance and listing require a bearer identity;
//! the trust graph is public.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::dto::{TrustGraphResponse, VoucherListResponse, VoucherResponse};
use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/v1/vouchers",
    tag = "Vouchers",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "The newly issued voucher", body = VoucherResponse),
        (status = 400, description = "Issuer already has 5 active vouchers")
    )
)]
pub async fn issue(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
) -> Result<(StatusCode, Json<VoucherResponse>), ApiError> {
    let voucher = state
        .vouchers
        .issue(&ctx.identity_id.to_string())
        .await?
        .ok_or_else(|| ApiError::BadRequest("maximum active vouchers already issued".to_string()))?;
    Ok((StatusCode::CREATED, Json(voucher.into())))
}

#[utoipa::path(
    get,
    path = "/v1/vouchers",
    tag = "Vouchers",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "This caller's currently active (unredeemed) vouchers", body = VoucherListResponse)
    )
)]
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<VoucherListResponse>, ApiError> {
    let items = state
        .vouchers
        .list_active_by_issuer(&ctx.identity_id.to_string())
        .await?;
    Ok(Json(VoucherListResponse {
        items: items.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/vouchers/trust-graph",
    tag = "Vouchers",
    responses(
        (status = 200, description = "Every redeemed voucher edge, issuer to redeemer", body = TrustGraphResponse)
    )
)]
pub async fn trust_graph(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrustGraphResponse>, ApiError> {
    let edges = state.vouchers.trust_graph().await?;
    Ok(Json(TrustGraphResponse {
        edges: edges.into_iter().map(Into::into).collect(),
    }))
}
