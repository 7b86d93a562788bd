//! Token validator's internal error type.
//!
//! Per spec §7/§9, the validator never surfaces the underlying cause of a
//! verification failure to its caller: `introspect`/`resolve_auth_context`
//! degrade to `Inactive`/`None` rather than propagate one of these. This
//! type exists purely to drive the internal fallback control flow (JWT
//! failure → introspection; introspection failure → inactive) and is
//! logged at the point of fallback, never returned across the crate's
//! public surface.

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is not a well-formed JWT")]
    NotAJwt,
    #[error("no JWKS URI configured")]
    JwksNotConfigured,
    #[error("fetching JWKS: {0}")]
    JwksFetch(String),
    #[error("no signing key found for kid {0:?}")]
    UnknownKid(Option<String>),
    #[error("JWT verification failed: {0}")]
    JwtVerification(#[from] jsonwebtoken::errors::Error),
    #[error("introspection request failed: {0}")]
    IntrospectionRequest(String),
    #[error("client metadata request failed: {0}")]
    ClientMetadataRequest(String),
}
