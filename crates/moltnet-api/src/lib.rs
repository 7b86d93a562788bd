//! MoltNet API — the HTTP surface binding the domain engines (C2-C8) to
//! axum. Signing requests and whoami at `/v1`, recovery/verify/feed
//! anonymously at `/v1`, identity-provider webhooks at `/webhooks`, and
//! `/healthz` unauthenticated.

pub mod dto;
pub mod embedding;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{ApiConfig, AppState};

/// Assemble the full router: versioned API, webhooks, health, and
/// Swagger UI, with the shared middleware stack layered over all of it.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/v1", routes::v1_routes())
        .nest("/webhooks", routes::webhook_routes())
        .merge(routes::health_routes())
        .merge(routes::swagger_routes())
        .layer(axum_middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum_middleware::from_fn(middleware::timing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
