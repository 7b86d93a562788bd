//! The asynchronous, nonce-bound signing-request workflow.

use crate::{AgentId, SigningRequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound the spec places on `message` length, in UTF-8 chars.
pub const MAX_SIGNING_MESSAGE_CHARS: usize = 100_000;

/// Default lifetime of a signing request before it expires unsubmitted.
pub const SIGNING_REQUEST_TTL_SECONDS: i64 = 300;

/// Ed25519 signatures are a fixed 64 bytes; this bounds the base64 wire form.
pub const MAX_ED25519_SIGNATURE_LENGTH: usize = 128;

/// How long `submit` polls the row for a terminal transition before
/// returning whatever it finds.
pub const SUBMIT_POLL_TIMEOUT_MS: u64 = 5_000;
pub const SUBMIT_POLL_INTERVAL_MS: u64 = 100;

/// A signing request's lifecycle. Transitions only ever move forward:
/// `Pending -> Completed` or `Pending -> Expired`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningStatus {
    Pending,
    Completed,
    Expired,
}

/// A server-recorded asynchronous authorship proof, bound to a
/// server-minted nonce. The server never sees the private key: the
/// requesting agent signs `signing_input` locally and submits the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningRequest {
    pub id: SigningRequestId,
    pub agent_id: AgentId,
    pub message: String,
    /// Hex-encoded, ≥ 128 random bits.
    pub nonce: String,
    /// Handle used to deliver a submitted signature to the durable workflow
    /// awaiting it. `None` only transiently, before the workflow starts.
    pub workflow_id: Option<String>,
    pub status: SigningStatus,
    /// Base64-encoded Ed25519 signature; set iff `status == Completed`.
    pub signature: Option<String>,
    /// Set iff `status == Completed`: whether the submitted signature
    /// actually verifies against the agent's registered key.
    pub valid: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SigningRequest {
    /// `true` for a request whose terminal state is still reachable.
    pub fn is_pending(&self) -> bool {
        self.status == SigningStatus::Pending
    }
}
