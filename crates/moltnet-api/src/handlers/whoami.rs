//! Identity-introspection handler.

use axum::Json;

use crate::dto::WhoamiResponse;
use crate::extractors::Authenticated;

#[utoipa::path(
    get,
    path = "/v1/whoami",
    tag = "Whoami",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's resolved identity", body = WhoamiResponse),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn whoami(Authenticated(ctx): Authenticated) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        identity_id: ctx.identity_id.to_string(),
        public_key: ctx.public_key,
        fingerprint: ctx.fingerprint,
        client_id: ctx.client_id,
    })
}
