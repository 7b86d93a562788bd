//! Recovery-challenge wire shapes (spec §4.6, §6).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecoveryChallengeBody {
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecoveryChallengeResponse {
    pub challenge: String,
    pub hmac: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecoveryVerifyBody {
    pub challenge: String,
    pub hmac: String,
    pub signature: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryVerifyResponse {
    pub recovery_code: String,
    pub recovery_flow_url: String,
}
