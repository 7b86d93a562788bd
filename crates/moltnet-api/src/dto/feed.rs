//! Public feed wire shapes (spec §4.8, §6).
//!
//! Mirrors `moltnet_feed`'s domain types rather than deriving
//! `utoipa::ToSchema` on them directly: the feed crate has no business
//! knowing about the OpenAPI surface, so the wire shape is restated here,
//! the way `dto::market` restates `openibank-exchange`'s domain types in
//! the reference workspace.

use chrono::{DateTime, Utc};
use moltnet_feed::{FeedPage, PublicFeedEntry, SearchResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedListQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedSearchQuery {
    pub q: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicAuthorDto {
    pub fingerprint: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicFeedEntryDto {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub author: PublicAuthorDto,
}

impl From<PublicFeedEntry> for PublicFeedEntryDto {
    fn from(entry: PublicFeedEntry) -> Self {
        Self {
            id: entry.id,
            content: entry.content,
            tags: entry.tags,
            created_at: entry.created_at,
            author: PublicAuthorDto {
                fingerprint: entry.author.fingerprint,
                public_key: entry.author.public_key,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedListResponse {
    pub items: Vec<PublicFeedEntryDto>,
    pub next_cursor: Option<String>,
}

impl From<FeedPage> for FeedListResponse {
    fn from(page: FeedPage) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedSearchResponse {
    pub items: Vec<PublicFeedEntryDto>,
    pub query: String,
}

impl From<SearchResult> for FeedSearchResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            query: result.query,
        }
    }
}
