//! The relationship-tuple permission model governing diary visibility.

use serde::{Deserialize, Serialize};

/// The closed set of namespaces a relationship tuple's `object` can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Namespace {
    Agent,
    Diary,
    DiaryEntry,
}

/// The closed set of relations a tuple may assert between an object and a
/// subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Owner,
    Writer,
    Reader,
    Viewer,
    /// `(Agent, id, self, id)` — the tuple every agent gets at registration.
    #[serde(rename = "self")]
    Self_,
    /// Ties a `DiaryEntry` object back to its containing `Diary`, so
    /// `DiaryEntry.view` can derive through `parent.read`.
    Parent,
}

/// `(namespace, object, relation, subject)` — the unit of the relationship
/// store. `object` and `subject` are opaque string ids (a `Namespace`
/// member's own id space), kept as strings here so the type is agnostic to
/// which concrete id type (`AgentId`, `DiaryId`, `DiaryEntryId`) fills it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipTuple {
    pub namespace: Namespace,
    pub object: String,
    pub relation: Relation,
    pub subject: String,
}

impl RelationshipTuple {
    pub fn new(
        namespace: Namespace,
        object: impl Into<String>,
        relation: Relation,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            namespace,
            object: object.into(),
            relation,
            subject: subject.into(),
        }
    }
}

/// The derived, named permissions a caller may hold against a `DiaryEntry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryPermission {
    View,
    Edit,
    Delete,
    Share,
}

/// The derived, named permissions a caller may hold against a `Diary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiaryPermission {
    Read,
    Write,
}
