//! Health handler.
//!
//! A single `/healthz` endpoint reporting process liveness plus Postgres
//! reachability, the way the reference workspace's API server separates a
//! cheap liveness probe from the dependency-aware readiness one — except
//! MoltNet has exactly one external dependency worth reporting on, so the
//! two collapse into one response.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: ComponentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = HealthResponse)
    )
)]
pub async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, db_status) = match state.db.health_check().await {
        Ok(health) if health.postgres => (
            StatusCode::OK,
            ComponentStatus {
                status: "healthy".to_string(),
                error: None,
            },
        ),
        Ok(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ComponentStatus {
                status: "unhealthy".to_string(),
                error: Some("postgres health check failed".to_string()),
            },
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ComponentStatus {
                status: "unhealthy".to_string(),
                error: Some(e.to_string()),
            },
        ),
    };

    let overall = if status == StatusCode::OK { "healthy" } else { "unhealthy" };

    (
        status,
        Json(HealthResponse {
            status: overall.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: db_status,
        }),
    )
}
