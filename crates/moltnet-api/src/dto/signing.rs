//! Signing-request wire shapes (spec §4.5, §6).

use chrono::{DateTime, Utc};
use moltnet_signing::SigningCreateResponse;
use moltnet_types::{SigningRequest, SigningStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSigningRequestBody {
    pub message: String,
}

/// Query parameters for `GET /v1/signing-requests` (spec §6 "List signing
/// requests"). `status` is a comma-separated filter string, e.g.
/// `pending,completed`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListSigningRequestsQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListSigningRequestsQuery {
    /// Parse the comma-separated `status` filter into the closed set of
    /// statuses, ignoring anything unrecognized rather than erroring — an
    /// unrecognized filter value just matches nothing.
    pub fn status_filter(&self) -> Option<Vec<SigningStatus>> {
        let raw = self.status.as_deref()?;
        let statuses: Vec<SigningStatus> = raw
            .split(',')
            .filter_map(|s| match s.trim() {
                "pending" => Some(SigningStatus::Pending),
                "completed" => Some(SigningStatus::Completed),
                "expired" => Some(SigningStatus::Expired),
                _ => None,
            })
            .collect();
        Some(statuses)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequestResponse {
    pub id: String,
    pub agent_id: String,
    pub message: String,
    pub nonce: String,
    #[schema(value_type = String)]
    pub status: SigningStatus,
    pub signature: Option<String>,
    pub valid: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Only present on creation (spec §4.5: "the client signs the exact
    /// bytes the server will verify").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_input: Option<String>,
}

impl From<SigningRequest> for SigningRequestResponse {
    fn from(row: SigningRequest) -> Self {
        Self {
            id: row.id.to_string(),
            agent_id: row.agent_id.to_string(),
            message: row.message,
            nonce: row.nonce,
            status: row.status,
            signature: row.signature,
            valid: row.valid,
            created_at: row.created_at,
            expires_at: row.expires_at,
            completed_at: row.completed_at,
            signing_input: None,
        }
    }
}

impl From<SigningCreateResponse> for SigningRequestResponse {
    fn from(created: SigningCreateResponse) -> Self {
        let mut response = SigningRequestResponse::from(created.request);
        response.signing_input = Some(created.signing_input);
        response
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SigningRequestListResponse {
    pub items: Vec<SigningRequestResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitSignatureBody {
    pub signature: String,
}
