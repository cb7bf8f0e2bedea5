use std::sync::Arc;

use super::context::{
    AuthorizationContext, ContextBuilder, CredentialRejection, ProjectMembership, Scheme,
    VerifiedCredential,
};
use super::credential::{classify, Credential};
use super::verifier::TokenVerifier;

/// classify -> verify -> build context, once per request.
///
/// Verification failures of either scheme degrade to an anonymous context
/// that carries the rejection, so public reads keep working and protected
/// operations can report why the credential was not accepted.
pub struct AuthResolver {
    idp_scheme: String,
    verifier: Arc<TokenVerifier>,
    builder: ContextBuilder,
}

impl AuthResolver {
    pub fn new(
        idp_scheme: impl Into<String>,
        verifier: Arc<TokenVerifier>,
        membership: Arc<dyn ProjectMembership>,
    ) -> Self {
        Self {
            idp_scheme: idp_scheme.into(),
            verifier,
            builder: ContextBuilder::new(membership),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub async fn resolve(&self, authorization: Option<&str>) -> AuthorizationContext {
        let verified = match classify(authorization, &self.idp_scheme) {
            Credential::NoCredential => VerifiedCredential::Anonymous,
            Credential::CustomToken(token) => match self.verifier.verify_custom(&token).await {
                Ok(claims) => VerifiedCredential::CustomToken(claims),
                Err(e) => {
                    tracing::warn!("Custom token rejected: {}", e);
                    VerifiedCredential::Rejected(CredentialRejection {
                        scheme: Scheme::CustomToken,
                        reason: e.to_string(),
                    })
                }
            },
            Credential::IdentityProviderToken(token) => {
                match self.verifier.verify_identity(&token).await {
                    Ok(claims) => VerifiedCredential::IdentityProvider(claims),
                    Err(e) => {
                        tracing::warn!("Identity-provider token rejected: {}", e);
                        VerifiedCredential::Rejected(CredentialRejection {
                            scheme: Scheme::IdentityProvider,
                            reason: e.to_string(),
                        })
                    }
                }
            }
        };

        let ctx = self.builder.build(verified).await;
        tracing::debug!(
            "Resolved auth context: scheme={:?} subject={:?} projects={}",
            ctx.scheme(),
            ctx.subject(),
            ctx.authorized_project_ids().len()
        );
        ctx
    }
}
