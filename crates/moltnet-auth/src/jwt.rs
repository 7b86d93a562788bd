//! JWT verification against a JWKS endpoint (spec §4.2 JWT path).
//!
//! Only reached when a `kid`-bearing token classifies as a JWT and a JWKS
//! URI is configured. Any failure along this path — fetch, unknown `kid`,
//! bad signature, `iss`/`aud`/`exp`/`nbf` mismatch — is the caller's signal
//! to fall back to introspection; nothing here is fatal to the overall
//! resolution.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::config::TokenValidatorConfig;
use crate::error::{AuthError, AuthResult};

/// The claims this service cares about. Unknown claims are ignored by
/// `serde`'s default (non-`deny_unknown_fields`) behavior.
#[derive(Debug, Deserialize)]
pub struct MoltNetClaims {
    pub iss: String,
    pub aud: serde_json::Value,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(rename = "moltnet:identity_id", default)]
    pub moltnet_identity_id: Option<String>,
    #[serde(rename = "moltnet:public_key", default)]
    pub moltnet_public_key: Option<String>,
    #[serde(rename = "moltnet:fingerprint", default)]
    pub moltnet_fingerprint: Option<String>,
}

pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_uri: String,
    allowed_issuers: Vec<String>,
    allowed_audiences: Vec<String>,
    key_cache: TtlCache<String, DecodingKey>,
}

impl JwksVerifier {
    pub fn new(config: &TokenValidatorConfig, jwks_uri: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .expect("building the JWKS http client");

        Self {
            client,
            jwks_uri,
            allowed_issuers: config.allowed_issuers.clone(),
            allowed_audiences: config.allowed_audiences.clone(),
            key_cache: TtlCache::new(
                config.jwks_cache_max_keys,
                Duration::from_secs(config.jwks_cache_ttl_secs),
            ),
        }
    }

    pub async fn verify(&self, token: &str) -> AuthResult<MoltNetClaims> {
        let header = decode_header(token)?;
        let kid = header.kid.clone();

        let key = match kid.as_deref().and_then(|k| self.key_cache.get(&k.to_string())) {
            Some(key) => key,
            None => self.fetch_and_cache_key(kid.as_deref()).await?,
        };

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&self.allowed_issuers);
        if !self.allowed_audiences.is_empty() {
            validation.set_audience(&self.allowed_audiences);
        } else {
            validation.validate_aud = false;
        }
        validation.validate_exp = true;
        validation.validate_nbf = false;

        let data = decode::<MoltNetClaims>(token, &key, &validation)?;

        if let Some(nbf) = data.claims.nbf {
            if nbf > chrono::Utc::now().timestamp() {
                return Err(AuthError::JwtVerification(
                    jsonwebtoken::errors::ErrorKind::ImmatureSignature.into(),
                ));
            }
        }

        Ok(data.claims)
    }

    async fn fetch_and_cache_key(&self, kid: Option<&str>) -> AuthResult<DecodingKey> {
        let resp = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;
        let jwk_set: JwkSet = resp
            .json()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        let jwk = match kid {
            Some(kid) => jwk_set.find(kid),
            None => jwk_set.keys.first(),
        }
        .ok_or_else(|| AuthError::UnknownKid(kid.map(str::to_string)))?;

        let key = DecodingKey::from_jwk(jwk).map_err(AuthError::JwtVerification)?;

        if let Some(kid) = kid {
            self.key_cache.insert(kid.to_string(), key.clone());
        }

        Ok(key)
    }
}

/// Unused by the validator's own path classification but kept alongside
/// the verifier as the reference point for `Algorithm` mapping should a
/// deployment need an explicit non-`alg`-from-header allowlist.
#[allow(dead_code)]
fn supported_algorithms() -> &'static [Algorithm] {
    &[Algorithm::RS256, Algorithm::ES256, Algorithm::EdDSA]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_ignore_unknown_fields() {
        let json = serde_json::json!({
            "iss": "https://issuer.example",
            "aud": "moltnet-api",
            "exp": 9999999999i64,
            "something_unrelated": "value",
        });
        let claims: MoltNetClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.iss, "https://issuer.example");
        assert!(claims.moltnet_identity_id.is_none());
    }
}
