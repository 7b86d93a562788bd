//! Database models - mapped from PostgreSQL tables
//!
//! These mirror the domain types in `moltnet-types` field-for-field, but as
//! `sqlx::FromRow` structs with raw `Uuid`/`String` columns instead of the
//! newtype wrappers: the repository layer converts at its boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbAgent {
    pub identity_id: Uuid,
    pub public_key: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbVoucher {
    pub code: String,
    pub issuer_id: Uuid,
    pub redeemed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSigningRequest {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub message: String,
    pub nonce: String,
    pub workflow_id: Option<String>,
    pub status: String,
    pub signature: Option<String>,
    pub valid: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbDiary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbDiaryEntry {
    pub id: Uuid,
    pub diary_id: Uuid,
    pub content: String,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRelationshipTuple {
    pub namespace: String,
    pub object: String,
    pub relation: String,
    pub subject: String,
}
