//! API Routes
//!
//! Route definitions for the MoltNet HTTP surface (spec §6).

use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;

use crate::handlers;
use crate::middleware as mw;
use crate::state::AppState;

/// The versioned API surface: signing requests, recovery, verification,
/// vouchers, public feed, whoami.
pub fn v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signing-requests", post(handlers::signing::create).get(handlers::signing::list))
        .route("/signing-requests/:id", get(handlers::signing::get))
        .route("/signing-requests/:id/submit", post(handlers::signing::submit))
        .route("/whoami", get(handlers::whoami::whoami))
        .route("/vouchers", post(handlers::voucher::issue).get(handlers::voucher::list_mine))
        .route("/vouchers/trust-graph", get(handlers::voucher::trust_graph))
        .merge(anonymous_v1_routes())
}

/// The subset of `/v1` with no bearer-token requirement, split out so the
/// rate-limit layer (spec §7 `RateLimited`) can apply to exactly the
/// routes reachable without proof of identity.
fn anonymous_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recovery/challenge", post(handlers::recovery::challenge))
        .route("/recovery/verify", post(handlers::recovery::verify))
        .route("/agents/:fingerprint/verify", post(handlers::verify::verify_agent_signature))
        .route("/verify", post(handlers::verify::verify_public_signature))
        .route("/feed", get(handlers::feed::list))
        .route("/feed/search", get(handlers::feed::search))
        .route("/feed/:id", get(handlers::feed::get))
        .layer(middleware::from_fn(mw::rate_limit_middleware))
}

/// The three identity-provider/OAuth2-server webhooks (spec §6), keyed
/// by shared secret rather than bearer token.
pub fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/after-registration", post(handlers::webhooks::after_registration))
        .route("/after-settings", post(handlers::webhooks::after_settings))
        .route("/token-exchange", post(handlers::webhooks::token_exchange))
}

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/healthz", get(handlers::health::healthz))
}

/// Swagger UI and the raw OpenAPI document.
pub fn swagger_routes() -> Router<Arc<AppState>> {
    use crate::openapi::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
