//! Authorship-verification wire shapes (spec §6 "Verify signature
//! (agent)" / "Verify signature (public)").
//!
//! These two endpoints are the synchronous counterpart to the
//! asynchronous nonce-bound signing-request workflow (C5): a caller who
//! already holds a raw `(message, signature)` pair — produced outside
//! MoltNet's `create`/`submit` flow entirely, so there is no server nonce
//! to bind it to — just wants it checked against a known public key.
//! They verify with [`moltnet_crypto::legacy::verify_raw`], the
//! crate's documented escape hatch for exactly this pre-envelope case.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyAgentSignatureBody {
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignerInfo {
    pub fingerprint: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyAgentSignatureResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerInfo>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPublicSignatureBody {
    pub public_key: String,
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPublicSignatureResponse {
    pub valid: bool,
}
