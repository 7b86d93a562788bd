//! Postgres-backed implementation of the public feed's two external seams:
//! `PublicEntryStore` (cursor-paginated listing, single read) and
//! `HybridSearch` (lexical `tsvector` ranking fused with an optional
//! embedding similarity pass, via Reciprocal Rank Fusion).
//!
//! Per spec §1, the vector index itself is out of scope for the core; this
//! is the narrow, swappable default that makes the workspace compile and
//! testable without a dedicated vector database. It ranks by cosine
//! similarity over the raw `real[]` embedding column rather than delegating
//! to a vector-index extension, which is adequate at the candidate-set
//! sizes a single-tenant deployment sees but is the first thing to swap for
//! a managed vector store at scale.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use moltnet_feed::{Cursor, FeedError, FeedResult, PublicAuthor, PublicEntryStore, PublicFeedRow};

/// Reciprocal Rank Fusion's smoothing constant — the conventional value.
const RRF_K: f64 = 60.0;

/// How many lexical/vector candidates are pulled before fusion. Bounds the
/// cost of the in-process cosine-similarity pass.
const CANDIDATE_POOL: i64 = 200;

pub struct PostgresHybridSearch {
    pool: PgPool,
}

impl PostgresHybridSearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PublicEntryRow {
    id: Uuid,
    content: String,
    tags: Vec<String>,
    embedding: Option<Vec<f32>>,
    created_at: DateTime<Utc>,
    fingerprint: String,
    public_key: String,
}

impl From<PublicEntryRow> for PublicFeedRow {
    fn from(row: PublicEntryRow) -> Self {
        PublicFeedRow {
            id: row.id.to_string(),
            content: row.content,
            tags: row.tags,
            created_at: row.created_at,
            author: PublicAuthor {
                fingerprint: row.fingerprint,
                public_key: row.public_key,
            },
        }
    }
}

fn to_feed_err(e: sqlx::Error) -> FeedError {
    FeedError::Store(e.to_string())
}

#[async_trait::async_trait]
impl PublicEntryStore for PostgresHybridSearch {
    async fn list_public(
        &self,
        cursor: Option<&Cursor>,
        tag: Option<&str>,
        limit: i64,
    ) -> FeedResult<Vec<PublicFeedRow>> {
        let (created_at, id) = match cursor {
            Some(c) => (
                Some(c.created_at),
                Some(Uuid::parse_str(&c.id).map_err(|_| FeedError::InvalidCursor)?),
            ),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, PublicEntryRow>(
            r#"
            SELECT e.id, e.content, e.tags, e.embedding, e.created_at,
                   a.fingerprint, a.public_key
            FROM diary_entries e
            JOIN diaries d ON d.id = e.diary_id
            JOIN agents a ON a.identity_id = d.owner_id
            WHERE d.visibility = 'public'
              AND ($3::text IS NULL OR $3 = ANY(e.tags))
              AND ($1::timestamptz IS NULL
                   OR (e.created_at, e.id) < ($1, $2))
            ORDER BY e.created_at DESC, e.id DESC
            LIMIT $4
            "#,
        )
        .bind(created_at)
        .bind(id)
        .bind(tag)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(to_feed_err)?;

        Ok(rows.into_iter().map(PublicFeedRow::from).collect())
    }

    async fn find_public_by_id(&self, id: &str) -> FeedResult<Option<PublicFeedRow>> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, PublicEntryRow>(
            r#"
            SELECT e.id, e.content, e.tags, e.embedding, e.created_at,
                   a.fingerprint, a.public_key
            FROM diary_entries e
            JOIN diaries d ON d.id = e.diary_id
            JOIN agents a ON a.identity_id = d.owner_id
            WHERE d.visibility = 'public' AND e.id = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_feed_err)?;

        Ok(row.map(PublicFeedRow::from))
    }
}

#[async_trait::async_trait]
impl moltnet_feed::HybridSearch for PostgresHybridSearch {
    async fn search(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        tag: Option<&str>,
        limit: i64,
    ) -> FeedResult<Vec<PublicFeedRow>> {
        let lexical = sqlx::query_as::<_, PublicEntryRow>(
            r#"
            SELECT e.id, e.content, e.tags, e.embedding, e.created_at,
                   a.fingerprint, a.public_key
            FROM diary_entries e
            JOIN diaries d ON d.id = e.diary_id
            JOIN agents a ON a.identity_id = d.owner_id
            WHERE d.visibility = 'public'
              AND e.content_tsv @@ plainto_tsquery('english', $1)
              AND ($2::text IS NULL OR $2 = ANY(e.tags))
            ORDER BY ts_rank_cd(e.content_tsv, plainto_tsquery('english', $1)) DESC
            LIMIT $3
            "#,
        )
        .bind(query)
        .bind(tag)
        .bind(CANDIDATE_POOL)
        .fetch_all(&self.pool)
        .await
        .map_err(to_feed_err)?;

        let vector_ranked = match embedding {
            Some(query_vec) => {
                let mut candidates = sqlx::query_as::<_, PublicEntryRow>(
                    r#"
                    SELECT e.id, e.content, e.tags, e.embedding, e.created_at,
                           a.fingerprint, a.public_key
                    FROM diary_entries e
                    JOIN diaries d ON d.id = e.diary_id
                    JOIN agents a ON a.identity_id = d.owner_id
                    WHERE d.visibility = 'public'
                      AND e.embedding IS NOT NULL
                      AND ($2::text IS NULL OR $2 = ANY(e.tags))
                    LIMIT $1
                    "#,
                )
                .bind(CANDIDATE_POOL * 2)
                .bind(tag)
                .fetch_all(&self.pool)
                .await
                .map_err(to_feed_err)?;

                candidates.sort_by(|a, b| {
                    let sim_a = cosine_similarity(query_vec, a.embedding.as_deref().unwrap_or(&[]));
                    let sim_b = cosine_similarity(query_vec, b.embedding.as_deref().unwrap_or(&[]));
                    sim_b.partial_cmp(&sim_a).unwrap_or(std::cmp::Ordering::Equal)
                });
                candidates
            }
            None => Vec::new(),
        };

        Ok(fuse_rrf(lexical, vector_ranked, limit))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Fuse two independently ranked candidate lists by Reciprocal Rank Fusion:
/// `score(id) = sum over lists containing id of 1 / (RRF_K + rank)`.
/// Descending fused score; the score itself is discarded at the boundary.
fn fuse_rrf(
    lexical: Vec<PublicEntryRow>,
    vector: Vec<PublicEntryRow>,
    limit: i64,
) -> Vec<PublicFeedRow> {
    use std::collections::HashMap;

    let mut scores: HashMap<Uuid, f64> = HashMap::new();
    let mut rows: HashMap<Uuid, PublicEntryRow> = HashMap::new();

    for (rank, row) in lexical.into_iter().enumerate() {
        *scores.entry(row.id).or_insert(0.0) += 1.0 / (RRF_K + rank as f64 + 1.0);
        rows.entry(row.id).or_insert(row);
    }
    for (rank, row) in vector.into_iter().enumerate() {
        *scores.entry(row.id).or_insert(0.0) += 1.0 / (RRF_K + rank as f64 + 1.0);
        rows.entry(row.id).or_insert(row);
    }

    let mut scored: Vec<(Uuid, f64)> = scores.into_iter().collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(limit.max(0) as usize)
        .filter_map(|(id, _)| rows.remove(&id))
        .map(PublicFeedRow::from)
        .collect()
}
