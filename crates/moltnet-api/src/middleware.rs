//! API Middleware
//!
//! Cross-cutting request handling shared by every route.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::state::AppState;

/// Per-IP sliding-window rate limit (spec §7 `RateLimited`), applied to
/// the unauthenticated surface where there's no bearer identity to key
/// on instead.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    match state.rate_limiter.check(&ip).await {
        Ok(()) => Ok(next.run(req).await),
        Err(retry_after) => {
            use axum::response::IntoResponse;
            Err(ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response())
        }
    }
}

/// Logs slow requests; every request at debug level.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let elapsed = start.elapsed();

    if elapsed.as_millis() > 1000 {
        tracing::warn!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            "slow request"
        );
    } else {
        tracing::debug!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            status = response.status().as_u16(),
            "request completed"
        );
    }

    response
}

/// Baseline security headers on every response.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("Referrer-Policy", "strict-origin-when-cross-origin".parse().unwrap());
    headers.insert(
        "Cache-Control",
        "no-store, no-cache, must-revalidate".parse().unwrap(),
    );

    response
}

/// Request body size limit, ahead of JSON deserialization.
pub async fn body_limit_middleware(
    req: Request,
    next: Next,
    max_size: usize,
) -> Result<Response, Response> {
    if let Some(content_length) = req.headers().get("content-length") {
        if let Ok(length_str) = content_length.to_str() {
            if let Ok(length) = length_str.parse::<usize>() {
                if length > max_size {
                    use axum::response::IntoResponse;
                    return Err(ApiError::BadRequest(format!(
                        "request body too large, maximum is {max_size} bytes"
                    ))
                    .into_response());
                }
            }
        }
    }

    Ok(next.run(req).await)
}
