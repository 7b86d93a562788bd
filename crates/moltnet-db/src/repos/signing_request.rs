//! Signing request repository
//!
//! The workflow engine (`moltnet-signing`) is the single writer of
//! `status`/`signature`/`valid`/`completed_at`; this repository only ever
//! performs the one atomic write per terminal transition plus the read
//! paths needed by `get`/`list`/`submit`'s poll loop.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbSigningRequest};
use moltnet_types::{SigningRequest, SigningStatus};

pub struct SigningRequestRepo {
    pool: PgPool,
}

impl SigningRequestRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: Uuid,
        agent_id: Uuid,
        message: &str,
        nonce: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<DbSigningRequest> {
        let row = sqlx::query_as::<_, DbSigningRequest>(
            r#"
            INSERT INTO signing_requests (id, agent_id, message, nonce, status, expires_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING id, agent_id, message, nonce, workflow_id, status, signature, valid,
                      created_at, expires_at, completed_at
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .bind(message)
        .bind(nonce)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Record the workflow handle once the durable workflow has started.
    pub async fn set_workflow_id(&self, id: Uuid, workflow_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE signing_requests SET workflow_id = $2 WHERE id = $1")
            .bind(id)
            .bind(workflow_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbSigningRequest>> {
        let row = sqlx::query_as::<_, DbSigningRequest>(
            r#"
            SELECT id, agent_id, message, nonce, workflow_id, status, signature, valid,
                   created_at, expires_at, completed_at
            FROM signing_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_for_agent(
        &self,
        agent_id: Uuid,
        status_filter: Option<&[String]>,
    ) -> DbResult<Vec<DbSigningRequest>> {
        let rows = match status_filter {
            Some(statuses) => {
                sqlx::query_as::<_, DbSigningRequest>(
                    r#"
                    SELECT id, agent_id, message, nonce, workflow_id, status, signature, valid,
                           created_at, expires_at, completed_at
                    FROM signing_requests
                    WHERE agent_id = $1 AND status = ANY($2)
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(agent_id)
                .bind(statuses)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DbSigningRequest>(
                    r#"
                    SELECT id, agent_id, message, nonce, workflow_id, status, signature, valid,
                           created_at, expires_at, completed_at
                    FROM signing_requests
                    WHERE agent_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(agent_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    /// Every still-pending row, used to rehydrate in-flight workflows after
    /// a restart.
    pub async fn list_pending(&self) -> DbResult<Vec<DbSigningRequest>> {
        let rows = sqlx::query_as::<_, DbSigningRequest>(
            r#"
            SELECT id, agent_id, message, nonce, workflow_id, status, signature, valid,
                   created_at, expires_at, completed_at
            FROM signing_requests
            WHERE status = 'pending'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Single atomic terminal transition to `completed`. Guarded by
    /// `status = 'pending'` so a duplicate delivery is a no-op (zero rows
    /// affected, not an error).
    pub async fn complete(
        &self,
        id: Uuid,
        signature: &str,
        valid: bool,
    ) -> DbResult<Option<DbSigningRequest>> {
        let row = sqlx::query_as::<_, DbSigningRequest>(
            r#"
            UPDATE signing_requests
            SET status = 'completed', signature = $2, valid = $3, completed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING id, agent_id, message, nonce, workflow_id, status, signature, valid,
                      created_at, expires_at, completed_at
            "#,
        )
        .bind(id)
        .bind(signature)
        .bind(valid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Single atomic terminal transition to `expired`.
    pub async fn expire(&self, id: Uuid) -> DbResult<Option<DbSigningRequest>> {
        let row = sqlx::query_as::<_, DbSigningRequest>(
            r#"
            UPDATE signing_requests
            SET status = 'expired'
            WHERE id = $1 AND status = 'pending'
            RETURNING id, agent_id, message, nonce, workflow_id, status, signature, valid,
                      created_at, expires_at, completed_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

fn parse_status(s: &str) -> SigningStatus {
    match s {
        "completed" => SigningStatus::Completed,
        "expired" => SigningStatus::Expired,
        _ => SigningStatus::Pending,
    }
}

fn status_str(status: SigningStatus) -> &'static str {
    match status {
        SigningStatus::Pending => "pending",
        SigningStatus::Completed => "completed",
        SigningStatus::Expired => "expired",
    }
}

impl From<DbSigningRequest> for SigningRequest {
    fn from(row: DbSigningRequest) -> Self {
        Self {
            id: row.id.into(),
            agent_id: row.agent_id.into(),
            message: row.message,
            nonce: row.nonce,
            workflow_id: row.workflow_id,
            status: parse_status(&row.status),
            signature: row.signature,
            valid: row.valid,
            created_at: row.created_at,
            expires_at: row.expires_at,
            completed_at: row.completed_at,
        }
    }
}

fn to_signing_err(e: crate::DbError) -> moltnet_signing::SigningError {
    moltnet_signing::SigningError::Store(e.to_string())
}

#[async_trait::async_trait]
impl moltnet_signing::SigningRequestStore for SigningRequestRepo {
    async fn create(
        &self,
        id: moltnet_types::SigningRequestId,
        agent_id: moltnet_types::AgentId,
        message: &str,
        nonce: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> moltnet_signing::SigningResult<SigningRequest> {
        self.create(id.into(), agent_id.into(), message, nonce, expires_at)
            .await
            .map(Into::into)
            .map_err(to_signing_err)
    }

    async fn set_workflow_id(
        &self,
        id: moltnet_types::SigningRequestId,
        workflow_id: &str,
    ) -> moltnet_signing::SigningResult<()> {
        self.set_workflow_id(id.into(), workflow_id)
            .await
            .map_err(to_signing_err)
    }

    async fn find_by_id(
        &self,
        id: moltnet_types::SigningRequestId,
    ) -> moltnet_signing::SigningResult<Option<SigningRequest>> {
        self.find_by_id(id.into())
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(to_signing_err)
    }

    async fn list_for_agent(
        &self,
        agent_id: moltnet_types::AgentId,
        status_filter: Option<&[SigningStatus]>,
    ) -> moltnet_signing::SigningResult<Vec<SigningRequest>> {
        let statuses = status_filter
            .map(|statuses| statuses.iter().copied().map(status_str).map(String::from).collect::<Vec<_>>());
        self.list_for_agent(agent_id.into(), statuses.as_deref())
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(to_signing_err)
    }

    async fn list_pending(&self) -> moltnet_signing::SigningResult<Vec<SigningRequest>> {
        self.list_pending()
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(to_signing_err)
    }

    async fn complete(
        &self,
        id: moltnet_types::SigningRequestId,
        signature: &str,
        valid: bool,
    ) -> moltnet_signing::SigningResult<Option<SigningRequest>> {
        self.complete(id.into(), signature, valid)
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(to_signing_err)
    }

    async fn expire(
        &self,
        id: moltnet_types::SigningRequestId,
    ) -> moltnet_signing::SigningResult<Option<SigningRequest>> {
        self.expire(id.into())
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(to_signing_err)
    }
}
