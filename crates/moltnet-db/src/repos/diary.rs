//! Diary and diary-entry repository.

use sqlx::postgres::Postgres;
use sqlx::{PgPool, Transaction};
use uuid::Uuid;

use crate::{DbDiary, DbDiaryEntry, DbError, DbResult};

pub struct DiaryRepo {
    pool: PgPool,
}

impl DiaryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the owner's diary if one already exists, else create a fresh
    /// private one. Used by the registration coordinator (C7), which must
    /// be idempotent under re-registration of the same `identity_id`.
    pub async fn get_or_create_default_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> DbResult<DbDiary> {
        if let Some(existing) = sqlx::query_as::<_, DbDiary>(
            r#"SELECT id, owner_id, visibility, created_at, updated_at
               FROM diaries WHERE owner_id = $1"#,
        )
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?
        {
            return Ok(existing);
        }

        let diary = sqlx::query_as::<_, DbDiary>(
            r#"
            INSERT INTO diaries (id, owner_id, visibility)
            VALUES ($1, $2, 'private')
            RETURNING id, owner_id, visibility, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(diary)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbDiary>> {
        let diary = sqlx::query_as::<_, DbDiary>(
            r#"SELECT id, owner_id, visibility, created_at, updated_at FROM diaries WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(diary)
    }

    pub async fn find_by_owner(&self, owner_id: Uuid) -> DbResult<Option<DbDiary>> {
        let diary = sqlx::query_as::<_, DbDiary>(
            r#"SELECT id, owner_id, visibility, created_at, updated_at FROM diaries WHERE owner_id = $1"#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(diary)
    }

    pub async fn create_entry(
        &self,
        diary_id: Uuid,
        content: &str,
        tags: &[String],
        embedding: Option<&[f32]>,
    ) -> DbResult<DbDiaryEntry> {
        let entry = sqlx::query_as::<_, DbDiaryEntry>(
            r#"
            INSERT INTO diary_entries (id, diary_id, content, tags, embedding)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, diary_id, content, tags, embedding, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(diary_id)
        .bind(content)
        .bind(tags)
        .bind(embedding.map(|e| e.to_vec()))
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    pub async fn find_entry_by_id(&self, id: Uuid) -> DbResult<Option<DbDiaryEntry>> {
        let entry = sqlx::query_as::<_, DbDiaryEntry>(
            r#"SELECT id, diary_id, content, tags, embedding, created_at, updated_at
               FROM diary_entries WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// `findPublicById` (§4.8): only returns the entry when its containing
    /// diary's visibility is `public`. A private or network entry id
    /// yields `None`, which the feed handler maps to a 404.
    pub async fn find_public_entry_by_id(&self, id: Uuid) -> DbResult<Option<DbDiaryEntry>> {
        let entry = sqlx::query_as::<_, DbDiaryEntry>(
            r#"
            SELECT e.id, e.diary_id, e.content, e.tags, e.embedding, e.created_at, e.updated_at
            FROM diary_entries e
            JOIN diaries d ON d.id = e.diary_id
            WHERE e.id = $1 AND d.visibility = 'public'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    pub async fn delete_entry(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM diary_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(result.rows_affected() > 0)
    }
}
