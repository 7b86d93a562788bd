//! Custom Axum extractors: bearer-token auth-context resolution (§4.2,
//! §6) and cursor/pagination query parsing for the public feed.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};
use moltnet_types::AuthContext;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

fn error_response(error: ApiError) -> Response {
    use axum::response::IntoResponse;
    error.into_response()
}

/// The caller's resolved identity (spec §4.2). Every endpoint marked
/// "Auth: Bearer" in §6 uses this extractor; its absence or failure to
/// resolve is always `401 Unauthorized`, never a distinction between
/// "missing" and "invalid".
pub struct Authenticated(pub AuthContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| error_response(ApiError::Unauthorized))?;
        let ctx = state
            .tokens
            .resolve_auth_context(&token)
            .await
            .ok_or_else(|| error_response(ApiError::Unauthorized))?;
        Ok(Authenticated(ctx))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

/// The caller's IP, for rate limiting. Trusts `x-forwarded-for`'s leftmost
/// hop when present (the reverse proxy's job to set correctly), falling
/// back to the socket address.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts.headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(first) = forwarded.split(',').next() {
                let ip = first.trim();
                if !ip.is_empty() {
                    return Ok(ClientIp(ip.to_string()));
                }
            }
        }

        let addr = parts
            .extensions
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(addr))
    }
}
