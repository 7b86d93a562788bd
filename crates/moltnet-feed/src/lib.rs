//! MoltNet Public Feed Gate (C8)
//!
//! Cursor pagination and hybrid lexical+vector search over public diary
//! entries (spec §4.8). This crate owns only the gate's pagination and
//! output-shaping logic; the concrete row store, the hybrid-search engine,
//! and the embedding model are external collaborators reached through the
//! [`PublicEntryStore`], [`HybridSearch`], and [`EmbeddingProvider`] seams
//! (spec §1 Non-goals).

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default/maximum page sizes for `list` (spec §4.8).
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 50;

/// Bounds and default for `search`'s `limit`.
pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const MAX_SEARCH_LIMIT: i64 = 50;

/// Bounds on `search`'s query string length, in chars.
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_QUERY_LEN: usize = 200;

/// The embedding dimensionality the hybrid-search engine expects.
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid cursor")]
    InvalidCursor,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// A caller-facing author projection: never the raw `AgentId`, so a public
/// entry can never be joined back to an owning identity by a malicious
/// client guessing at ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAuthor {
    pub fingerprint: String,
    pub public_key: String,
}

/// The wire shape of a public feed item. Never carries `owner_id` or
/// `embedding` (spec §8 testable property).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicFeedEntry {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub author: PublicAuthor,
}

/// The row shape the external store/search engine returns internally —
/// identical to [`PublicFeedEntry`] today, but kept distinct so a future
/// store-side field (e.g. a relevance score) never leaks into the wire
/// type by accident.
pub type PublicFeedRow = PublicFeedEntry;

/// Opaque `(created_at, id)` pagination cursor, transported as
/// `base64url(JSON)`. Ordering is `created_at DESC, id DESC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("cursor serializes");
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(s: &str) -> FeedResult<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| FeedError::InvalidCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| FeedError::InvalidCursor)
    }

    fn of(entry: &PublicFeedEntry) -> Self {
        Self {
            created_at: entry.created_at,
            id: entry.id.clone(),
        }
    }
}

/// A page of public feed results, with the cursor to fetch the next page
/// (absent iff this was the last page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<PublicFeedEntry>,
    pub next_cursor: Option<String>,
}

/// The search result shape: the matched entries plus the query that was
/// actually run, echoing back what was searched but never the fused score
/// (spec §4.8: "The `score` is not exposed to callers").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<PublicFeedEntry>,
    pub query: String,
}

/// The relational store's public-entry surface, kept narrow: list and
/// single-read only. Ordering and visibility filtering are the store's
/// responsibility; this crate only shapes pagination around it.
#[async_trait::async_trait]
pub trait PublicEntryStore: Send + Sync {
    /// Rows strictly after `cursor` (exclusive) in `created_at DESC, id
    /// DESC` order, optionally filtered by `tag`, at most `limit` rows.
    async fn list_public(
        &self,
        cursor: Option<&Cursor>,
        tag: Option<&str>,
        limit: i64,
    ) -> FeedResult<Vec<PublicFeedRow>>;

    /// `None` unless `id` names an entry whose containing diary is public.
    async fn find_public_by_id(&self, id: &str) -> FeedResult<Option<PublicFeedRow>>;
}

/// The external hybrid lexical+vector search engine (spec §1 Non-goals,
/// §4.8). Computes Reciprocal Rank Fusion internally; this crate never
/// sees or exposes the fused score.
#[async_trait::async_trait]
pub trait HybridSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        tag: Option<&str>,
        limit: i64,
    ) -> FeedResult<Vec<PublicFeedRow>>;
}

/// The external embedding model (spec §1 Non-goals). A failure here must
/// not fail the search — it falls back to lexical-only (spec §4.8, §7).
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, String>;
}

/// The public feed gate: cursor pagination, single-read, and hybrid
/// search, all scoped to anonymous callers over public entries only.
pub struct PublicFeedGate<Store, Search, Embed> {
    store: Store,
    search: Search,
    embed: Embed,
}

impl<Store, Search, Embed> PublicFeedGate<Store, Search, Embed>
where
    Store: PublicEntryStore,
    Search: HybridSearch,
    Embed: EmbeddingProvider,
{
    pub fn new(store: Store, search: Search, embed: Embed) -> Self {
        Self {
            store,
            search,
            embed,
        }
    }

    /// `GET /feed` (spec §4.8 List / §6 "Public feed list").
    pub async fn list(
        &self,
        cursor: Option<&str>,
        tag: Option<&str>,
        limit: Option<i64>,
    ) -> FeedResult<FeedPage> {
        let cursor = cursor.map(Cursor::decode).transpose()?;
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        // Over-fetch one row to know whether another page follows.
        let mut rows = self.store.list_public(cursor.as_ref(), tag, limit + 1).await?;
        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            rows.last().map(Cursor::of).map(|c| c.encode())
        } else {
            None
        };

        Ok(FeedPage {
            items: rows,
            next_cursor,
        })
    }

    /// `GET /feed/:id` (spec §4.8 Single read / §6 "Public entry get").
    /// Anonymous caller; returns `None` for a private/network entry or an
    /// unknown id — these are indistinguishable, mapped to 404 at the edge.
    pub async fn get(&self, id: &str) -> FeedResult<Option<PublicFeedEntry>> {
        self.store.find_public_by_id(id).await
    }

    /// `GET /feed/search` (spec §4.8 Search / §6 "Public feed search").
    pub async fn search(
        &self,
        query: &str,
        tag: Option<&str>,
        limit: Option<i64>,
    ) -> FeedResult<SearchResult> {
        let char_len = query.chars().count();
        if !(MIN_QUERY_LEN..=MAX_QUERY_LEN).contains(&char_len) {
            return Err(FeedError::InvalidQuery(format!(
                "query must be {MIN_QUERY_LEN}-{MAX_QUERY_LEN} chars, got {char_len}"
            )));
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        let embedding = match self.embed.embed(query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(error = %e, "embedding generation failed, falling back to lexical-only search");
                None
            }
        };

        let items = self
            .search
            .search(query, embedding.as_deref(), tag, limit)
            .await?;

        Ok(SearchResult {
            items,
            query: query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn entry(id: &str, created_at: DateTime<Utc>) -> PublicFeedEntry {
        PublicFeedEntry {
            id: id.to_string(),
            content: format!("entry {id}"),
            tags: vec![],
            created_at,
            author: PublicAuthor {
                fingerprint: "AAAA-AAAA-AAAA-AAAA".to_string(),
                public_key: "ed25519:AAAA".to_string(),
            },
        }
    }

    struct FakeStore {
        rows: Vec<PublicFeedEntry>,
    }

    #[async_trait::async_trait]
    impl PublicEntryStore for FakeStore {
        async fn list_public(
            &self,
            cursor: Option<&Cursor>,
            _tag: Option<&str>,
            limit: i64,
        ) -> FeedResult<Vec<PublicFeedRow>> {
            let start = match cursor {
                None => 0,
                Some(c) => self
                    .rows
                    .iter()
                    .position(|r| r.id == c.id)
                    .map(|i| i + 1)
                    .unwrap_or(self.rows.len()),
            };
            Ok(self
                .rows
                .iter()
                .skip(start)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn find_public_by_id(&self, id: &str) -> FeedResult<Option<PublicFeedRow>> {
            Ok(self.rows.iter().find(|r| r.id == id).cloned())
        }
    }

    struct FakeSearch {
        calls: Mutex<Vec<Option<Vec<f32>>>>,
    }

    #[async_trait::async_trait]
    impl HybridSearch for FakeSearch {
        async fn search(
            &self,
            _query: &str,
            embedding: Option<&[f32]>,
            _tag: Option<&str>,
            _limit: i64,
        ) -> FeedResult<Vec<PublicFeedRow>> {
            self.calls.lock().unwrap().push(embedding.map(|e| e.to_vec()));
            Ok(vec![])
        }
    }

    struct FailingEmbed;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FailingEmbed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, String> {
            Err("embedding service unavailable".to_string())
        }
    }

    struct WorkingEmbed;

    #[async_trait::async_trait]
    impl EmbeddingProvider for WorkingEmbed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, String> {
            Ok(vec![0.0; EMBEDDING_DIM])
        }
    }

    fn rows() -> Vec<PublicFeedEntry> {
        let base = Utc::now();
        (0..5)
            .map(|i| entry(&format!("e{i}"), base - chrono::Duration::seconds(i)))
            .collect()
    }

    #[tokio::test]
    async fn list_paginates_and_reports_has_more() {
        let gate = PublicFeedGate::new(
            FakeStore { rows: rows() },
            FakeSearch { calls: Mutex::new(vec![]) },
            WorkingEmbed,
        );
        let page = gate.list(None, None, Some(2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_some());
    }

    #[tokio::test]
    async fn list_last_page_has_no_cursor() {
        let gate = PublicFeedGate::new(
            FakeStore { rows: rows() },
            FakeSearch { calls: Mutex::new(vec![]) },
            WorkingEmbed,
        );
        let page = gate.list(None, None, Some(50)).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let gate = PublicFeedGate::new(
            FakeStore { rows: rows() },
            FakeSearch { calls: Mutex::new(vec![]) },
            WorkingEmbed,
        );
        let err = gate.list(Some("not-a-cursor!!"), None, None).await;
        assert!(matches!(err, Err(FeedError::InvalidCursor)));
    }

    #[tokio::test]
    async fn search_rejects_short_query() {
        let gate = PublicFeedGate::new(
            FakeStore { rows: rows() },
            FakeSearch { calls: Mutex::new(vec![]) },
            WorkingEmbed,
        );
        let err = gate.search("a", None, None).await;
        assert!(matches!(err, Err(FeedError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn search_falls_back_to_lexical_only_on_embedding_failure() {
        let search = FakeSearch { calls: Mutex::new(vec![]) };
        let gate = PublicFeedGate::new(FakeStore { rows: rows() }, search, FailingEmbed);
        let result = gate.search("hello world", None, None).await.unwrap();
        assert_eq!(result.query, "hello world");
        assert_eq!(gate.search.calls.lock().unwrap()[0], None);
    }

    #[tokio::test]
    async fn search_passes_embedding_through_on_success() {
        let search = FakeSearch { calls: Mutex::new(vec![]) };
        let gate = PublicFeedGate::new(FakeStore { rows: rows() }, search, WorkingEmbed);
        gate.search("hello world", None, None).await.unwrap();
        assert!(gate.search.calls.lock().unwrap()[0].is_some());
    }
}
