//! Postgres-backed relationship store - the default implementation of
//! `moltnet_permission::RelationshipStore` (C3).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::DbError;
use moltnet_permission::{PermissionError, PermissionResult, RelationshipStore};
use moltnet_types::{Namespace, Relation, RelationshipTuple};

pub struct PgRelationshipStore {
    pool: PgPool,
}

impl PgRelationshipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn namespace_str(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Agent => "Agent",
        Namespace::Diary => "Diary",
        Namespace::DiaryEntry => "DiaryEntry",
    }
}

fn relation_str(relation: Relation) -> &'static str {
    match relation {
        Relation::Owner => "owner",
        Relation::Writer => "writer",
        Relation::Reader => "reader",
        Relation::Viewer => "viewer",
        Relation::Self_ => "self",
        Relation::Parent => "parent",
    }
}

impl From<DbError> for PermissionError {
    fn from(e: DbError) -> Self {
        PermissionError::Store(e.to_string())
    }
}

#[async_trait]
impl RelationshipStore for PgRelationshipStore {
    async fn check(&self, tuple: &RelationshipTuple) -> PermissionResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM relationship_tuples
                WHERE namespace = $1 AND object = $2 AND relation = $3 AND subject = $4
            )
            "#,
        )
        .bind(namespace_str(tuple.namespace))
        .bind(&tuple.object)
        .bind(relation_str(tuple.relation))
        .bind(&tuple.subject)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PermissionError::Store(e.to_string()))?;

        Ok(exists)
    }

    async fn write(&self, tuple: RelationshipTuple) -> PermissionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO relationship_tuples (namespace, object, relation, subject)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(namespace_str(tuple.namespace))
        .bind(&tuple.object)
        .bind(relation_str(tuple.relation))
        .bind(&tuple.subject)
        .execute(&self.pool)
        .await
        .map_err(|e| PermissionError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, tuple: &RelationshipTuple) -> PermissionResult<()> {
        sqlx::query(
            r#"
            DELETE FROM relationship_tuples
            WHERE namespace = $1 AND object = $2 AND relation = $3 AND subject = $4
            "#,
        )
        .bind(namespace_str(tuple.namespace))
        .bind(&tuple.object)
        .bind(relation_str(tuple.relation))
        .bind(&tuple.subject)
        .execute(&self.pool)
        .await
        .map_err(|e| PermissionError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete_all_for_object(
        &self,
        namespace: Namespace,
        object: &str,
    ) -> PermissionResult<()> {
        sqlx::query(r#"DELETE FROM relationship_tuples WHERE namespace = $1 AND object = $2"#)
            .bind(namespace_str(namespace))
            .bind(object)
            .execute(&self.pool)
            .await
            .map_err(|e| PermissionError::Store(e.to_string()))?;

        Ok(())
    }

    async fn find_subject(
        &self,
        namespace: Namespace,
        object: &str,
        relation: Relation,
    ) -> PermissionResult<Option<String>> {
        let subject: Option<String> = sqlx::query_scalar(
            r#"
            SELECT subject FROM relationship_tuples
            WHERE namespace = $1 AND object = $2 AND relation = $3
            LIMIT 1
            "#,
        )
        .bind(namespace_str(namespace))
        .bind(object)
        .bind(relation_str(relation))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PermissionError::Store(e.to_string()))?;

        Ok(subject)
    }
}

