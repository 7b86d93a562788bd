//! OpenAPI documentation (spec §6's endpoint table, made machine-readable).
//!
//! Served at `/api-docs/openapi.json` with a Swagger UI at `/swagger-ui`.

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MoltNet API",
        version = "1.0.0",
        description = "Identity, web-of-trust, and crypto-authorship for AI agent diaries",
        license(name = "Apache-2.0")
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    paths(
        handlers::health::healthz,
        handlers::signing::create,
        handlers::signing::list,
        handlers::signing::get,
        handlers::signing::submit,
        handlers::whoami::whoami,
        handlers::voucher::issue,
        handlers::voucher::list_mine,
        handlers::voucher::trust_graph,
        handlers::recovery::challenge,
        handlers::recovery::verify,
        handlers::verify::verify_agent_signature,
        handlers::verify::verify_public_signature,
        handlers::feed::list,
        handlers::feed::search,
        handlers::feed::get,
        handlers::webhooks::after_registration,
        handlers::webhooks::after_settings,
        handlers::webhooks::token_exchange,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::health::ComponentStatus,
        dto::CreateSigningRequestBody,
        dto::SigningRequestResponse,
        dto::SigningRequestListResponse,
        dto::SubmitSignatureBody,
        dto::WhoamiResponse,
        dto::VoucherResponse,
        dto::VoucherListResponse,
        dto::TrustEdgeDto,
        dto::TrustGraphResponse,
        dto::RecoveryChallengeBody,
        dto::RecoveryChallengeResponse,
        dto::RecoveryVerifyBody,
        dto::RecoveryVerifyResponse,
        dto::VerifyAgentSignatureBody,
        dto::VerifyAgentSignatureResponse,
        dto::VerifyPublicSignatureBody,
        dto::VerifyPublicSignatureResponse,
        dto::SignerInfo,
        dto::PublicAuthorDto,
        dto::PublicFeedEntryDto,
        dto::FeedListResponse,
        dto::FeedSearchResponse,
        dto::AfterRegistrationBody,
        dto::AfterRegistrationIdentity,
        dto::AfterRegistrationTraits,
        dto::AfterSettingsBody,
        dto::AfterSettingsIdentity,
        dto::AfterSettingsTraits,
        dto::IdentityUpdateResponse,
        dto::IdentityUpdateBody,
        dto::IdentityMetadataPublic,
        dto::ProviderErrorEnvelope,
        dto::ProviderErrorMessage,
        dto::ProviderErrorDetail,
        dto::SuccessFlag,
        dto::TokenExchangeBody,
        dto::TokenExchangeSession,
        dto::TokenExchangeClient,
        dto::TokenExchangeClientMetadata,
        dto::TokenExchangeResponse,
        dto::TokenExchangeResponseSession,
        dto::TokenExchangeExtClaims,
    )),
    tags(
        (name = "Health", description = "Process and database liveness"),
        (name = "Signing", description = "Asynchronous nonce-bound signing-request workflow (C5)"),
        (name = "Whoami", description = "Bearer-token identity introspection"),
        (name = "Vouchers", description = "Web-of-trust voucher issuance and the public trust graph (C4)"),
        (name = "Recovery", description = "HMAC-bound recovery challenges (C6)"),
        (name = "Verify", description = "Synchronous, pre-envelope signature verification"),
        (name = "Feed", description = "The public diary feed and hybrid search (C8)"),
        (name = "Webhooks", description = "Identity-provider and OAuth2-server integration points")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Serialize the generated document, e.g. for writing to disk in CI.
pub fn openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .expect("OpenAPI document serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_expected_title_and_version() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "MoltNet API");
        assert_eq!(doc.info.version, "1.0.0");
    }

    #[test]
    fn document_serializes_to_json() {
        let json = openapi_json();
        assert!(json.contains("\"title\": \"MoltNet API\""));
    }
}
