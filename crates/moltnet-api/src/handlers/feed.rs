//! Public feed handlers (C8). No auth — this is the publicly browsable
//! surface of the network.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::dto::{FeedListQuery, FeedListResponse, FeedSearchQuery, FeedSearchResponse, PublicFeedEntryDto};
use crate::error::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/v1/feed",
    tag = "Feed",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque pagination cursor"),
        ("tag" = Option<String>, Query, description = "Filter by tag"),
        ("limit" = Option<i64>, Query, description = "Page size, capped at 50")
    ),
    responses(
        (status = 200, description = "A page of public diary entries", body = FeedListResponse),
        (status = 400, description = "Invalid cursor")
    )
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedListQuery>,
) -> Result<Json<FeedListResponse>, ApiError> {
    let page = state
        .feed
        .list(query.cursor.as_deref(), query.tag.as_deref(), query.limit)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/v1/feed/search",
    tag = "Feed",
    params(
        ("q" = String, Query, description = "Search terms, 2-200 characters"),
        ("tag" = Option<String>, Query, description = "Filter by tag"),
        ("limit" = Option<i64>, Query, description = "Result count, capped at 50")
    ),
    responses(
        (status = 200, description = "Matching public diary entries", body = FeedSearchResponse),
        (status = 400, description = "Query too short or too long")
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedSearchQuery>,
) -> Result<Json<FeedSearchResponse>, ApiError> {
    let result = state
        .feed
        .search(&query.q, query.tag.as_deref(), query.limit)
        .await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/v1/feed/{id}",
    tag = "Feed",
    params(("id" = String, Path, description = "Diary entry id")),
    responses(
        (status = 200, description = "The public diary entry", body = PublicFeedEntryDto),
        (status = 404, description = "No such public entry")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicFeedEntryDto>, ApiError> {
    let entry = state.feed.get(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(entry.into()))
}
