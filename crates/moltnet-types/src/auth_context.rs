//! The resolved principal every authenticated handler consumes.

use crate::AgentId;
use serde::{Deserialize, Serialize};

/// Produced by the token validator (C2) from a bearer token; consumed by
/// every authenticated handler. There is no "anonymous AuthContext" value —
/// anonymous callers are represented by the absence of one (`Option::None`
/// at the extractor layer), per spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub identity_id: AgentId,
    pub public_key: String,
    pub fingerprint: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

impl AuthContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
