//! Agent repository

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbAgent, DbError, DbResult};

/// Agent repository for the identity directory.
pub struct AgentRepo {
    pool: PgPool,
}

impl AgentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new agent, or update its key material if it already exists.
    /// Used by the registration coordinator (C7) and the settings webhook.
    pub async fn upsert(
        &self,
        identity_id: Uuid,
        public_key: &str,
        fingerprint: &str,
    ) -> DbResult<DbAgent> {
        upsert_in(&self.pool, identity_id, public_key, fingerprint).await
    }

    /// Same as `upsert`, but participating in an already-open transaction —
    /// used by the registration coordinator, which must commit the agent
    /// row, the default diary, and its ownership grant atomically.
    pub async fn upsert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        identity_id: Uuid,
        public_key: &str,
        fingerprint: &str,
    ) -> DbResult<DbAgent> {
        upsert_in(&mut **tx, identity_id, public_key, fingerprint).await
    }

    pub async fn find_by_id(&self, identity_id: Uuid) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>(
            r#"
            SELECT identity_id, public_key, fingerprint, created_at, updated_at
            FROM agents
            WHERE identity_id = $1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(agent)
    }

    pub async fn find_by_public_key(&self, public_key: &str) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>(
            r#"
            SELECT identity_id, public_key, fingerprint, created_at, updated_at
            FROM agents
            WHERE public_key = $1
            "#,
        )
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(agent)
    }

    /// Used by the `verify signature (agent)` endpoint (spec §6), which
    /// looks callers up by the fingerprint in the path rather than the
    /// public key in the body.
    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>(
            r#"
            SELECT identity_id, public_key, fingerprint, created_at, updated_at
            FROM agents
            WHERE fingerprint = $1
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(agent)
    }
}

#[async_trait::async_trait]
impl moltnet_signing::AgentKeyLookup for AgentRepo {
    async fn public_key_for(
        &self,
        agent_id: moltnet_types::AgentId,
    ) -> moltnet_signing::SigningResult<Option<String>> {
        self.find_by_id(agent_id.into())
            .await
            .map(|opt| opt.map(|row| row.public_key))
            .map_err(|e| moltnet_signing::SigningError::Store(e.to_string()))
    }
}

#[async_trait::async_trait]
impl moltnet_recovery::AgentLookup for AgentRepo {
    async fn find_by_public_key(
        &self,
        public_key: &str,
    ) -> moltnet_recovery::RecoveryResult<Option<moltnet_types::AgentId>> {
        self.find_by_public_key(public_key)
            .await
            .map(|opt| opt.map(|row| row.identity_id.into()))
            .map_err(|e| moltnet_recovery::RecoveryError::Store(e.to_string()))
    }
}

async fn upsert_in<'c, E>(
    executor: E,
    identity_id: Uuid,
    public_key: &str,
    fingerprint: &str,
) -> DbResult<DbAgent>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, DbAgent>(
        r#"
        INSERT INTO agents (identity_id, public_key, fingerprint)
        VALUES ($1, $2, $3)
        ON CONFLICT (identity_id)
        DO UPDATE SET public_key = $2, fingerprint = $3, updated_at = NOW()
        RETURNING identity_id, public_key, fingerprint, created_at, updated_at
        "#,
    )
    .bind(identity_id)
    .bind(public_key)
    .bind(fingerprint)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.constraint() == Some("agents_public_key_key")
                || db_err.constraint() == Some("agents_fingerprint_key")
            {
                return DbError::Duplicate("public key already registered".to_string());
            }
        }
        DbError::Query(e)
    })
}
