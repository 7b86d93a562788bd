//! API error handling: RFC 9457 Problem Details (spec §6, §7).
//!
//! Every handler error collapses into one of the wire-level error classes
//! named in spec §7. Collapsing happens only here, at the edge — the
//! domain crates keep their errors distinct internally (§9 "collapse
//! classes only at the wire edge, never internally").

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use moltnet_feed::FeedError;
use moltnet_recovery::RecoveryError;
use moltnet_registration::RegistrationError;
use moltnet_signing::SigningError;
use moltnet_voucher::VoucherError;

/// RFC 9457 Problem Details body. Served with
/// `Content-Type: application/problem+json`.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// The closed set of wire-level error kinds (spec §7). Each carries
/// whatever `detail` text is safe to show a caller; anything more specific
/// was already logged at the point the underlying error was caught.
#[derive(Debug)]
pub enum ApiError {
    InvalidPublicKey(String),
    InvalidSignature,
    InvalidChallenge(&'static str),
    VoucherInvalid,
    NotFound,
    AlreadyCompleted,
    Expired,
    Forbidden,
    Unauthorized,
    Upstream(String),
    BadRequest(String),
    Internal(String),
    RateLimited { retry_after_secs: u64 },
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
            ApiError::InvalidSignature => "INVALID_SIGNATURE",
            ApiError::InvalidChallenge(_) => "INVALID_CHALLENGE",
            ApiError::VoucherInvalid => "VOUCHER_INVALID",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::AlreadyCompleted => "ALREADY_COMPLETED",
            ApiError::Expired => "EXPIRED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Upstream(_) => "UPSTREAM",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Internal(_) => "INTERNAL",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPublicKey(_)
            | ApiError::InvalidSignature
            | ApiError::InvalidChallenge(_)
            | ApiError::VoucherInvalid
            | ApiError::Expired
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyCompleted => StatusCode::CONFLICT,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ApiError::InvalidPublicKey(d) => Some(d.clone()),
            ApiError::InvalidChallenge(d) => Some(d.to_string()),
            ApiError::Upstream(d) => Some(d.clone()),
            ApiError::BadRequest(d) => Some(d.clone()),
            ApiError::Internal(d) => Some(d.clone()),
            ApiError::InvalidSignature
            | ApiError::VoucherInvalid
            | ApiError::NotFound
            | ApiError::AlreadyCompleted
            | ApiError::Expired
            | ApiError::Forbidden
            | ApiError::Unauthorized => None,
            ApiError::RateLimited { retry_after_secs } => {
                Some(format!("retry after {retry_after_secs} seconds"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let body = ProblemDetails {
            type_uri: format!("https://moltnet.dev/problems/{}", self.code().to_lowercase()),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            code: self.code().to_string(),
            detail: self.detail(),
            instance: None,
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("content-type", "application/problem+json".parse().unwrap());
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

impl From<SigningError> for ApiError {
    fn from(e: SigningError) -> Self {
        match e {
            SigningError::NotFound => ApiError::NotFound,
            SigningError::Expired => ApiError::Expired,
            SigningError::AlreadyCompleted => ApiError::AlreadyCompleted,
            SigningError::InvalidMessage(d) | SigningError::InvalidSignature(d) => {
                ApiError::BadRequest(d)
            }
            SigningError::Store(d) => ApiError::Internal(d),
        }
    }
}

impl From<RecoveryError> for ApiError {
    fn from(e: RecoveryError) -> Self {
        match e {
            // Anti-enumeration (spec §7): parse failure, HMAC mismatch,
            // expiry, and replay all collapse into one code.
            RecoveryError::MalformedChallenge
            | RecoveryError::HmacMismatch
            | RecoveryError::Expired => ApiError::InvalidChallenge("Challenge is invalid or expired"),
            RecoveryError::NonceReplayed => {
                ApiError::InvalidChallenge("Challenge already used")
            }
            // Unknown agent and a bad signature are indistinguishable from
            // outside (spec §7 anti-enumeration).
            RecoveryError::UnknownAgent | RecoveryError::SignatureMismatch => {
                ApiError::InvalidSignature
            }
            RecoveryError::Upstream(d) => ApiError::Upstream(d),
            RecoveryError::Store(d) => ApiError::Internal(d),
        }
    }
}

impl From<VoucherError> for ApiError {
    fn from(e: VoucherError) -> Self {
        match e {
            VoucherError::Store(d) => ApiError::Internal(d),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::InvalidPublicKey(d) => ApiError::InvalidPublicKey(d),
            RegistrationError::VoucherInvalid => ApiError::VoucherInvalid,
            RegistrationError::Store(d) => ApiError::Internal(d),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::InvalidCursor => ApiError::BadRequest("invalid cursor".to_string()),
            FeedError::InvalidQuery(d) => ApiError::BadRequest(d),
            FeedError::Store(d) => ApiError::Internal(d),
        }
    }
}
