//! Voucher wire shapes. The endpoint table in the external-interfaces
//! section only names the identity-provider-facing registration webhook
//! for *redeeming* a voucher; an agent still needs some bearer-authenticated
//! way to mint one for the web-of-trust to grow past its first member, so
//! this crate exposes issuance, listing, and the trust graph directly.

use chrono::{DateTime, Utc};
use moltnet_types::{TrustEdge, Voucher};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoucherResponse {
    pub code: String,
    pub issuer_id: String,
    pub redeemed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<Voucher> for VoucherResponse {
    fn from(v: Voucher) -> Self {
        Self {
            code: v.code,
            issuer_id: v.issuer_id.to_string(),
            redeemed_by: v.redeemed_by.map(|id| id.to_string()),
            created_at: v.created_at,
            expires_at: v.expires_at,
            redeemed_at: v.redeemed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherListResponse {
    pub items: Vec<VoucherResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustEdgeDto {
    pub issuer_fingerprint: String,
    pub redeemer_fingerprint: String,
    pub redeemed_at: DateTime<Utc>,
}

impl From<TrustEdge> for TrustEdgeDto {
    fn from(e: TrustEdge) -> Self {
        Self {
            issuer_fingerprint: e.issuer_fingerprint,
            redeemer_fingerprint: e.redeemer_fingerprint,
            redeemed_at: e.redeemed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrustGraphResponse {
    pub edges: Vec<TrustEdgeDto>,
}
