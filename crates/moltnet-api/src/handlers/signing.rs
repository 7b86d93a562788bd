//! Signing-request workflow handlers (C5).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::{
    CreateSigningRequestBody, ListSigningRequestsQuery, SigningRequestListResponse,
    SigningRequestResponse, SubmitSignatureBody,
};
use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/v1/signing-requests",
    tag = "Signing",
    security(("bearer" = [])),
    request_body = CreateSigningRequestBody,
    responses(
        (status = 201, description = "The created signing request, with its signing input", body = SigningRequestResponse),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Json(body): Json<CreateSigningRequestBody>,
) -> Result<(StatusCode, Json<SigningRequestResponse>), ApiError> {
    let created = state.signing.create(ctx.identity_id, body.message).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/v1/signing-requests",
    tag = "Signing",
    security(("bearer" = [])),
    params(
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("offset" = Option<i64>, Query, description = "Page offset"),
        ("status" = Option<String>, Query, description = "Comma-separated status filter: pending,completed,expired")
    ),
    responses(
        (status = 200, description = "This caller's signing requests", body = SigningRequestListResponse)
    )
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Query(query): Query<ListSigningRequestsQuery>,
) -> Result<Json<SigningRequestListResponse>, ApiError> {
    let filter = query.status_filter();
    let rows = state
        .signing
        .list(ctx.identity_id, filter.as_deref())
        .await?;
    Ok(Json(SigningRequestListResponse {
        items: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/signing-requests/{id}",
    tag = "Signing",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Signing request id")),
    responses(
        (status = 200, description = "The signing request", body = SigningRequestResponse),
        (status = 404, description = "No such signing request, or it belongs to another agent")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SigningRequestResponse>, ApiError> {
    let row = state.signing.get(id.into(), ctx.identity_id).await?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    post,
    path = "/v1/signing-requests/{id}/submit",
    tag = "Signing",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Signing request id")),
    request_body = SubmitSignatureBody,
    responses(
        (status = 200, description = "Completed (valid may be true or false)", body = SigningRequestResponse),
        (status = 404, description = "No such signing request, or it belongs to another agent"),
        (status = 409, description = "Already completed"),
        (status = 400, description = "Expired")
    )
)]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitSignatureBody>,
) -> Result<Json<SigningRequestResponse>, ApiError> {
    let row = state
        .signing
        .submit(id.into(), ctx.identity_id, body.signature)
        .await?;
    Ok(Json(row.into()))
}
