//! Registration store adapter (C7)
//!
//! Commits the agent upsert and the default-diary fetch-or-create inside a
//! single Postgres transaction, so `moltnet-registration` never has to
//! reason about partial failure between the two.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{AgentRepo, DbError, DiaryRepo};
use moltnet_types::{Agent, AgentId, Diary, DiaryId, Fingerprint, PublicKeyString, Visibility};

pub struct RegistrationRepo {
    pool: PgPool,
    agents: AgentRepo,
    diaries: DiaryRepo,
}

impl RegistrationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            agents: AgentRepo::new(pool.clone()),
            diaries: DiaryRepo::new(pool.clone()),
            pool,
        }
    }
}

fn parse_visibility(s: &str) -> Visibility {
    match s {
        "public" => Visibility::Public,
        "network" => Visibility::Network,
        _ => Visibility::Private,
    }
}

fn to_registration_err(e: DbError) -> moltnet_registration::RegistrationError {
    moltnet_registration::RegistrationError::Store(e.to_string())
}

#[async_trait::async_trait]
impl moltnet_registration::RegistrationStore for RegistrationRepo {
    async fn upsert_agent_and_default_diary(
        &self,
        identity_id: AgentId,
        public_key: &str,
        fingerprint: &str,
    ) -> moltnet_registration::RegistrationResult<(Agent, Diary)> {
        let identity_uuid: Uuid = identity_id.into();

        let mut tx = self.pool.begin().await.map_err(DbError::Query).map_err(to_registration_err)?;

        let db_agent = self
            .agents
            .upsert_tx(&mut tx, identity_uuid, public_key, fingerprint)
            .await
            .map_err(to_registration_err)?;

        let db_diary = self
            .diaries
            .get_or_create_default_tx(&mut tx, identity_uuid)
            .await
            .map_err(to_registration_err)?;

        tx.commit().await.map_err(DbError::Query).map_err(to_registration_err)?;

        let agent = Agent {
            identity_id: db_agent.identity_id.into(),
            public_key: PublicKeyString::new(db_agent.public_key),
            fingerprint: Fingerprint::new(db_agent.fingerprint),
            created_at: db_agent.created_at,
            updated_at: db_agent.updated_at,
        };
        let diary = Diary {
            id: DiaryId::from_uuid(db_diary.id),
            owner_id: db_diary.owner_id.into(),
            visibility: parse_visibility(&db_diary.visibility),
            created_at: db_diary.created_at,
            updated_at: db_diary.updated_at,
        };

        Ok((agent, diary))
    }
}
