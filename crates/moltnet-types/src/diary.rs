//! The per-agent append-mostly journal and its entries.
//!
//! This uses the newer `diaryId + diary.visibility` schema: visibility is a
//! property of the `Diary`, not duplicated per-entry (see the Design Notes
//! on the legacy `ownerId + visibility` shape, which this supersedes).

use crate::{AgentId, DiaryEntryId, DiaryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who besides the owner can read a diary's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner and agents explicitly granted `viewer`.
    Private,
    /// Any authenticated agent in the network.
    Network,
    /// Discoverable and readable by anonymous callers via the public feed.
    Public,
}

/// A per-agent journal. Every agent gets a default private diary at
/// registration (C7); additional diaries are not part of the current
/// surface but the shape does not preclude them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diary {
    pub id: DiaryId,
    pub owner_id: AgentId,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single journal entry.
///
/// `embedding` and the entry's owning agent are never part of the
/// public-facing output shape (§4.8) — see `PublicFeedEntry` in
/// `moltnet-feed` for the externally-visible projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: DiaryEntryId,
    pub diary_id: DiaryId,
    pub content: String,
    pub tags: Vec<String>,
    /// 384-dim embedding vector, populated by an external `EmbeddingProvider`.
    /// Absent when embedding generation failed or was never attempted.
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
