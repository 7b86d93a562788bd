//! Identity-introspection wire shape.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResponse {
    pub identity_id: String,
    pub public_key: String,
    pub fingerprint: String,
    pub client_id: String,
}
