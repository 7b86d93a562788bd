//! MoltNet Permission Model (C3)
//!
//! Namespaces, relations, and the derived permissions that govern diary
//! visibility (spec §3, §4.3). The model itself holds no state: it is a
//! thin layer of derivation logic over an external [`RelationshipStore`],
//! matching the reference workspace's pattern of depending on narrow
//! capability traits rather than a concrete database.
//!
//! Every check is a single positive query. A store error is treated as
//! *deny*, never as open-by-default (§4.3): `PermissionError::Store` never
//! propagates out of a `can_*` method as `true`.

use async_trait::async_trait;
use moltnet_types::{DiaryPermission, EntryPermission, Namespace, Relation, RelationshipTuple};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("relationship store error: {0}")]
    Store(String),
}

pub type PermissionResult<T> = Result<T, PermissionError>;

/// The external relationship store C3 depends on (§1: out of scope for the
/// core itself). `moltnet-db::PgRelationshipStore` is the default
/// implementation; tests use an in-memory fake (see `tests/` in this
/// crate).
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Does this exact tuple exist?
    async fn check(&self, tuple: &RelationshipTuple) -> PermissionResult<bool>;

    /// Idempotent write: inserting an existing tuple is not an error.
    async fn write(&self, tuple: RelationshipTuple) -> PermissionResult<()>;

    /// Idempotent delete: deleting a non-existent tuple is not an error.
    async fn delete(&self, tuple: &RelationshipTuple) -> PermissionResult<()>;

    /// Delete every tuple with the given object, regardless of relation or
    /// subject. Used when a `DiaryEntry` is deleted (§4.3
    /// `removeEntryRelations`).
    async fn delete_all_for_object(
        &self,
        namespace: Namespace,
        object: &str,
    ) -> PermissionResult<()>;

    /// The single subject asserting `relation` over `object`, if any. Used
    /// to resolve a `DiaryEntry`'s `parent` tuple back to its containing
    /// `Diary`'s id.
    async fn find_subject(
        &self,
        namespace: Namespace,
        object: &str,
        relation: Relation,
    ) -> PermissionResult<Option<String>>;
}

/// The derivation logic over a [`RelationshipStore`]. Stateless; cheap to
/// clone (it only ever holds a shared handle to the store).
#[derive(Clone)]
pub struct PermissionModel<S: RelationshipStore> {
    store: std::sync::Arc<S>,
}

impl<S: RelationshipStore> PermissionModel<S> {
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }

    fn deny_on_error(result: PermissionResult<bool>) -> bool {
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "relationship store error, denying access");
            false
        })
    }

    /// `DiaryEntry.view ⇐ owner ∨ viewer ∨ parent.read`
    pub async fn can(&self, permission: EntryPermission, entry_id: &str, agent_id: &str) -> bool {
        match permission {
            EntryPermission::View => self.can_view_entry(entry_id, agent_id).await,
            EntryPermission::Edit | EntryPermission::Delete | EntryPermission::Share => {
                self.is_entry_owner(entry_id, agent_id).await
            }
        }
    }

    async fn is_entry_owner(&self, entry_id: &str, agent_id: &str) -> bool {
        Self::deny_on_error(
            self.store
                .check(&RelationshipTuple::new(
                    Namespace::DiaryEntry,
                    entry_id,
                    Relation::Owner,
                    agent_id,
                ))
                .await,
        )
    }

    async fn can_view_entry(&self, entry_id: &str, agent_id: &str) -> bool {
        if self.is_entry_owner(entry_id, agent_id).await {
            return true;
        }

        let is_viewer = Self::deny_on_error(
            self.store
                .check(&RelationshipTuple::new(
                    Namespace::DiaryEntry,
                    entry_id,
                    Relation::Viewer,
                    agent_id,
                ))
                .await,
        );
        if is_viewer {
            return true;
        }

        let parent_diary = self
            .store
            .find_subject(Namespace::DiaryEntry, entry_id, Relation::Parent)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "relationship store error, denying access");
                None
            });

        match parent_diary {
            Some(diary_id) => {
                self.check_diary_permission(DiaryPermission::Read, &diary_id, agent_id)
                    .await
            }
            None => false,
        }
    }

    /// `Diary.read ⇐ owner ∨ readers`, `Diary.write ⇐ owner ∨ writers`.
    pub async fn can_diary(
        &self,
        permission: DiaryPermission,
        diary_id: &str,
        agent_id: &str,
    ) -> bool {
        self.check_diary_permission(permission, diary_id, agent_id)
            .await
    }

    async fn check_diary_permission(
        &self,
        permission: DiaryPermission,
        diary_id: &str,
        agent_id: &str,
    ) -> bool {
        let is_owner = Self::deny_on_error(
            self.store
                .check(&RelationshipTuple::new(
                    Namespace::Diary,
                    diary_id,
                    Relation::Owner,
                    agent_id,
                ))
                .await,
        );
        if is_owner {
            return true;
        }

        let relation = match permission {
            DiaryPermission::Read => Relation::Reader,
            DiaryPermission::Write => Relation::Writer,
        };

        Self::deny_on_error(
            self.store
                .check(&RelationshipTuple::new(
                    Namespace::Diary,
                    diary_id,
                    relation,
                    agent_id,
                ))
                .await,
        )
    }

    pub async fn grant_ownership(&self, entry_id: &str, agent_id: &str) -> PermissionResult<()> {
        self.store
            .write(RelationshipTuple::new(
                Namespace::DiaryEntry,
                entry_id,
                Relation::Owner,
                agent_id,
            ))
            .await
    }

    pub async fn grant_viewer(&self, entry_id: &str, agent_id: &str) -> PermissionResult<()> {
        self.store
            .write(RelationshipTuple::new(
                Namespace::DiaryEntry,
                entry_id,
                Relation::Viewer,
                agent_id,
            ))
            .await
    }

    pub async fn revoke_viewer(&self, entry_id: &str, agent_id: &str) -> PermissionResult<()> {
        self.store
            .delete(&RelationshipTuple::new(
                Namespace::DiaryEntry,
                entry_id,
                Relation::Viewer,
                agent_id,
            ))
            .await
    }

    pub async fn link_entry_to_diary(&self, entry_id: &str, diary_id: &str) -> PermissionResult<()> {
        self.store
            .write(RelationshipTuple::new(
                Namespace::DiaryEntry,
                entry_id,
                Relation::Parent,
                diary_id,
            ))
            .await
    }

    pub async fn register_agent(&self, agent_id: &str) -> PermissionResult<()> {
        self.store
            .write(RelationshipTuple::new(
                Namespace::Agent,
                agent_id,
                Relation::Self_,
                agent_id,
            ))
            .await
    }

    pub async fn grant_diary_owner(&self, diary_id: &str, agent_id: &str) -> PermissionResult<()> {
        self.store
            .write(RelationshipTuple::new(
                Namespace::Diary,
                diary_id,
                Relation::Owner,
                agent_id,
            ))
            .await
    }

    pub async fn remove_entry_relations(&self, entry_id: &str) -> PermissionResult<()> {
        self.store
            .delete_all_for_object(Namespace::DiaryEntry, entry_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        tuples: Mutex<HashSet<RelationshipTuple>>,
    }

    #[async_trait]
    impl RelationshipStore for FakeStore {
        async fn check(&self, tuple: &RelationshipTuple) -> PermissionResult<bool> {
            Ok(self.tuples.lock().unwrap().contains(tuple))
        }

        async fn write(&self, tuple: RelationshipTuple) -> PermissionResult<()> {
            self.tuples.lock().unwrap().insert(tuple);
            Ok(())
        }

        async fn delete(&self, tuple: &RelationshipTuple) -> PermissionResult<()> {
            self.tuples.lock().unwrap().remove(tuple);
            Ok(())
        }

        async fn delete_all_for_object(
            &self,
            namespace: Namespace,
            object: &str,
        ) -> PermissionResult<()> {
            self.tuples
                .lock()
                .unwrap()
                .retain(|t| !(t.namespace == namespace && t.object == object));
            Ok(())
        }

        async fn find_subject(
            &self,
            namespace: Namespace,
            object: &str,
            relation: Relation,
        ) -> PermissionResult<Option<String>> {
            Ok(self
                .tuples
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.namespace == namespace && t.object == object && t.relation == relation)
                .map(|t| t.subject.clone()))
        }
    }

    fn model() -> PermissionModel<FakeStore> {
        PermissionModel::new(std::sync::Arc::new(FakeStore::default()))
    }

    #[tokio::test]
    async fn owner_can_view_edit_delete_share() {
        let m = model();
        m.grant_ownership("entry-1", "agent-a").await.unwrap();
        assert!(m.can(EntryPermission::View, "entry-1", "agent-a").await);
        assert!(m.can(EntryPermission::Edit, "entry-1", "agent-a").await);
        assert!(m.can(EntryPermission::Delete, "entry-1", "agent-a").await);
        assert!(m.can(EntryPermission::Share, "entry-1", "agent-a").await);
    }

    #[tokio::test]
    async fn stranger_cannot_view_private_entry() {
        let m = model();
        m.grant_ownership("entry-1", "agent-a").await.unwrap();
        assert!(!m.can(EntryPermission::View, "entry-1", "agent-b").await);
    }

    #[tokio::test]
    async fn viewer_can_view_but_not_edit() {
        let m = model();
        m.grant_ownership("entry-1", "agent-a").await.unwrap();
        m.grant_viewer("entry-1", "agent-b").await.unwrap();
        assert!(m.can(EntryPermission::View, "entry-1", "agent-b").await);
        assert!(!m.can(EntryPermission::Edit, "entry-1", "agent-b").await);
    }

    #[tokio::test]
    async fn revoked_viewer_loses_view() {
        let m = model();
        m.grant_ownership("entry-1", "agent-a").await.unwrap();
        m.grant_viewer("entry-1", "agent-b").await.unwrap();
        m.revoke_viewer("entry-1", "agent-b").await.unwrap();
        assert!(!m.can(EntryPermission::View, "entry-1", "agent-b").await);
    }

    #[tokio::test]
    async fn view_derives_through_parent_diary_read() {
        let m = model();
        m.grant_diary_owner("diary-1", "agent-a").await.unwrap();
        m.link_entry_to_diary("entry-1", "diary-1").await.unwrap();
        // agent-a owns the diary but not the entry directly; view still
        // derives through parent.read.
        assert!(m.can(EntryPermission::View, "entry-1", "agent-a").await);
    }

    #[tokio::test]
    async fn diary_reader_can_read_not_write() {
        let m = model();
        m.grant_diary_owner("diary-1", "agent-a").await.unwrap();
        m.store
            .write(RelationshipTuple::new(
                Namespace::Diary,
                "diary-1",
                Relation::Reader,
                "agent-b",
            ))
            .await
            .unwrap();
        assert!(m.can_diary(DiaryPermission::Read, "diary-1", "agent-b").await);
        assert!(!m.can_diary(DiaryPermission::Write, "diary-1", "agent-b").await);
    }

    #[tokio::test]
    async fn remove_entry_relations_clears_everything() {
        let m = model();
        m.grant_ownership("entry-1", "agent-a").await.unwrap();
        m.grant_viewer("entry-1", "agent-b").await.unwrap();
        m.remove_entry_relations("entry-1").await.unwrap();
        assert!(!m.can(EntryPermission::View, "entry-1", "agent-a").await);
        assert!(!m.can(EntryPermission::View, "entry-1", "agent-b").await);
    }

    #[tokio::test]
    async fn registering_agent_writes_self_relation() {
        let m = model();
        m.register_agent("agent-a").await.unwrap();
        assert!(
            m.store
                .check(&RelationshipTuple::new(
                    Namespace::Agent,
                    "agent-a",
                    Relation::Self_,
                    "agent-a",
                ))
                .await
                .unwrap()
        );
    }
}
